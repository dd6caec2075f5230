use crate::document::Document;
use crate::error::{SerializeError, SerializeResult};
use crate::model::{Element, ExtensionElements};

const BPMN_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
const CAMUNDA_NS: &str = "http://camunda.org/schema/1.0/bpmn";

/// Serializer converts the document tree to its XML text form
///
/// Output is canonical for a given tree: attribute order is fixed and
/// empty optional attributes are omitted, so two equal trees always
/// serialize to the same text.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "  ".to_string(), // 2 spaces
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    /// Serialize a Document to XML
    pub fn serialize(&mut self, doc: &Document) -> SerializeResult<String> {
        let mut output = String::new();

        output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        output.push_str("<bpmn:definitions xmlns:bpmn=\"");
        output.push_str(BPMN_NS);
        output.push_str("\" xmlns:camunda=\"");
        output.push_str(CAMUNDA_NS);
        output.push_str("\" id=\"");
        output.push_str(&escape(&doc.id, &doc.id, "id")?);
        output.push_str("\">\n");

        self.indent_level += 1;
        self.serialize_element(doc.root(), &mut output)?;
        self.indent_level -= 1;

        output.push_str("</bpmn:definitions>\n");
        Ok(output)
    }

    fn serialize_element(&mut self, element: &Element, output: &mut String) -> SerializeResult<()> {
        let tag = element.kind.tag();

        self.write_indent(output);
        output.push_str("<bpmn:");
        output.push_str(tag);
        self.write_attr(output, "id", &element.id, element)?;
        if !element.name.is_empty() {
            self.write_attr(output, "name", &element.name, element)?;
        }
        if element.kind.is_container() {
            output.push_str(" isExecutable=\"true\"");
        }
        if element.kind.supports_implementation() {
            if !element.implementation.task_type.is_empty() {
                self.write_attr(output, "camunda:type", &element.implementation.task_type, element)?;
            }
            if !element.implementation.topic.is_empty() {
                self.write_attr(output, "camunda:topic", &element.implementation.topic, element)?;
            }
        }

        let has_body = !element.documentation.is_empty()
            || element.extension_elements.is_some()
            || !element.children.is_empty();

        if !has_body {
            output.push_str(" />\n");
            return Ok(());
        }
        output.push_str(">\n");
        self.indent_level += 1;

        for doc in &element.documentation {
            self.write_indent(output);
            output.push_str("<bpmn:documentation>");
            output.push_str(&escape(&doc.text, &element.id, "documentation")?);
            output.push_str("</bpmn:documentation>\n");
        }

        if let Some(ext) = &element.extension_elements {
            self.serialize_extensions(ext, element, output)?;
        }

        for child in &element.children {
            self.serialize_element(child, output)?;
        }

        self.indent_level -= 1;
        self.write_indent(output);
        output.push_str("</bpmn:");
        output.push_str(tag);
        output.push_str(">\n");
        Ok(())
    }

    fn serialize_extensions(
        &mut self,
        ext: &ExtensionElements,
        element: &Element,
        output: &mut String,
    ) -> SerializeResult<()> {
        self.write_indent(output);
        let Some(properties) = &ext.properties else {
            output.push_str("<bpmn:extensionElements />\n");
            return Ok(());
        };
        output.push_str("<bpmn:extensionElements>\n");
        self.indent_level += 1;

        self.write_indent(output);
        if properties.values.is_empty() {
            output.push_str("<camunda:properties />\n");
        } else {
            output.push_str("<camunda:properties>\n");
            self.indent_level += 1;
            for property in &properties.values {
                self.write_indent(output);
                output.push_str("<camunda:property");
                self.write_attr(output, "name", &property.name, element)?;
                self.write_attr(output, "value", &property.value, element)?;
                output.push_str(" />\n");
            }
            self.indent_level -= 1;
            self.write_indent(output);
            output.push_str("</camunda:properties>\n");
        }

        self.indent_level -= 1;
        self.write_indent(output);
        output.push_str("</bpmn:extensionElements>\n");
        Ok(())
    }

    fn write_attr(
        &self,
        output: &mut String,
        name: &str,
        value: &str,
        element: &Element,
    ) -> SerializeResult<()> {
        output.push(' ');
        output.push_str(name);
        output.push_str("=\"");
        output.push_str(&escape(value, &element.id, name)?);
        output.push('"');
        Ok(())
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape text for XML, rejecting characters XML 1.0 cannot represent
fn escape(value: &str, element: &str, field: &str) -> SerializeResult<String> {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {
                return Err(SerializeError::invalid_character(element, field));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Convenience function to serialize a document
pub fn serialize(doc: &Document) -> SerializeResult<String> {
    Serializer::new().serialize(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_service_task() {
        let doc = Document::builder("Definitions_1", "Process_1")
            .service_task("Task_1")
            .name("Ask assistant")
            .documentation("Calls the assistant")
            .implementation("external", "openai-call")
            .extension("service.name", "dadm-openai-assistant")
            .build();

        let xml = serialize(&doc).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<bpmn:process id=\"Process_1\" isExecutable=\"true\">"));
        assert!(xml.contains(
            "<bpmn:serviceTask id=\"Task_1\" name=\"Ask assistant\" camunda:type=\"external\" camunda:topic=\"openai-call\">"
        ));
        assert!(xml.contains("<bpmn:documentation>Calls the assistant</bpmn:documentation>"));
        assert!(xml.contains(
            "<camunda:property name=\"service.name\" value=\"dadm-openai-assistant\" />"
        ));
        assert!(xml.trim_end().ends_with("</bpmn:definitions>"));
    }

    #[test]
    fn test_serialize_empty_containers() {
        let mut doc = Document::builder("D", "P").service_task("Task_1").build();
        let key = doc.find_by_id("Task_1").unwrap().key.clone();
        let ext = doc.create_extension_elements();
        doc.element_mut(&key).unwrap().extension_elements = Some(ext);

        let xml = serialize(&doc).unwrap();
        assert!(xml.contains("<bpmn:extensionElements />"));

        let props = doc.create_properties();
        doc.element_mut(&key)
            .unwrap()
            .extension_elements
            .as_mut()
            .unwrap()
            .properties = Some(props);

        let xml = serialize(&doc).unwrap();
        assert!(xml.contains("<camunda:properties />"));
    }

    #[test]
    fn test_escapes_markup() {
        let doc = Document::builder("D", "P")
            .service_task("Task_1")
            .name("A & B <\"quoted\">")
            .build();

        let xml = serialize(&doc).unwrap();
        assert!(xml.contains("name=\"A &amp; B &lt;&quot;quoted&quot;&gt;\""));
    }

    #[test]
    fn test_rejects_control_characters() {
        let doc = Document::builder("D", "P")
            .service_task("Task_1")
            .documentation("bell\u{7}")
            .build();

        let err = serialize(&doc).unwrap_err();
        assert_eq!(
            err,
            SerializeError::InvalidCharacter {
                element: "Task_1".to_string(),
                field: "documentation".to_string(),
            }
        );
    }

    #[test]
    fn test_generic_elements_skip_implementation() {
        let mut doc = Document::builder("D", "P").start_event("Start").build();
        let key = doc.find_by_id("Start").unwrap().key.clone();
        doc.element_mut(&key).unwrap().implementation.topic = "ignored".to_string();

        let xml = serialize(&doc).unwrap();
        assert!(xml.contains("<bpmn:startEvent id=\"Start\" />"));
        assert!(!xml.contains("ignored"));
    }

    #[test]
    fn test_custom_indent() {
        let doc = Document::builder("D", "P").start_event("Start").build();
        let xml = Serializer::with_indent("\t").serialize(&doc).unwrap();
        assert!(xml.contains("\n\t\t<bpmn:startEvent"));
    }
}
