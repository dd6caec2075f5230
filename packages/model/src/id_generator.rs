use crc32fast::Hasher;

use crate::model::NodeKey;

/// Generate a document seed from its definitions id using CRC32
pub fn get_document_seed(definitions_id: &str) -> String {
    let mut buff = String::from(definitions_id);
    if !definitions_id.starts_with("bpmn://") {
        buff = format!("bpmn://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential key generator for elements within a document
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    seed: String,
    count: u32,
}

impl KeyGenerator {
    pub fn new(definitions_id: &str) -> Self {
        Self {
            seed: get_document_seed(definitions_id),
            count: 0,
        }
    }

    /// Generate next sequential key
    pub fn next_key(&mut self) -> NodeKey {
        self.count += 1;
        NodeKey::new(format!("{}-{}", self.seed, self.count))
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_seed_is_stable() {
        let a = get_document_seed("Definitions_1");
        let b = get_document_seed("Definitions_1");
        assert_eq!(a, b);

        let c = get_document_seed("Definitions_2");
        assert_ne!(a, c);
    }

    #[test]
    fn test_sequential_keys() {
        let mut gen = KeyGenerator::new("Definitions_1");

        let k1 = gen.next_key();
        let k2 = gen.next_key();

        assert!(k1.as_str().ends_with("-1"));
        assert!(k2.as_str().ends_with("-2"));
        assert!(k1.as_str().starts_with(gen.seed()));
    }
}
