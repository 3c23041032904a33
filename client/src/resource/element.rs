//! Owned XML element tree with `/`-separated path lookup
//!
//! Cloud API payloads are small documents of nested elements whose leaves
//! carry text (often CDATA). Attributes on elements are not used by the API
//! and are ignored.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::ResourceError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> Result<Self, ResourceError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    stack.push(Element::new(&String::from_utf8_lossy(
                        start.name().as_ref(),
                    )));
                }
                Ok(Event::Empty(empty)) => {
                    let element = Element::new(&String::from_utf8_lossy(empty.name().as_ref()));
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(text)) => {
                    let text = text
                        .unescape()
                        .map_err(|e| ResourceError::Xml(e.to_string()))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(cdata)) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                    }
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ResourceError::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(ResourceError::Xml(e.to_string())),
            }
        }

        if !stack.is_empty() {
            return Err(ResourceError::Xml("unexpected end of document".to_string()));
        }
        root.ok_or_else(|| ResourceError::Xml("document has no root element".to_string()))
    }

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Children with the given element name, in document order
    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First element at `path` relative to this element (e.g. `TEMPLATE/IDENTITY`)
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |current, segment| {
                current.children.iter().find(|c| c.name == segment)
            })
    }

    /// All elements at `path`. Every segment but the last follows the first match;
    /// the last segment collects all siblings of that name (e.g. `TEMPLATE/DISK`).
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let (parent, last) = match path.rsplit_once('/') {
            Some((parent, last)) => (self.find(parent), last),
            None => (Some(self), path),
        };
        parent
            .map(|p| p.children.iter().filter(|c| c.name == last).collect())
            .unwrap_or_default()
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ResourceError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ResourceError::Xml("multiple root elements".to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM: &str = r#"<?xml version="1.0"?>
        <VM>
          <ID>42</ID>
          <NAME><![CDATA[web & db]]></NAME>
          <TEMPLATE>
            <DISK><SIZE>100</SIZE></DISK>
            <DISK><SIZE>250</SIZE></DISK>
            <EMPTY/>
          </TEMPLATE>
          <NOTE>a &lt; b</NOTE>
        </VM>"#;

    #[test]
    fn test_parse_and_find() {
        let vm = Element::parse(VM).unwrap();
        assert_eq!(vm.name(), "VM");
        assert_eq!(vm.find("ID").unwrap().text(), "42");
        assert_eq!(vm.find("NAME").unwrap().text(), "web & db");
        assert_eq!(vm.find("NOTE").unwrap().text(), "a < b");
        assert_eq!(vm.find("TEMPLATE/DISK/SIZE").unwrap().text(), "100");
        assert_eq!(vm.find("TEMPLATE/EMPTY").unwrap().text(), "");
        assert!(vm.find("TEMPLATE/MEMORY").is_none());
    }

    #[test]
    fn test_find_all_collects_siblings() {
        let vm = Element::parse(VM).unwrap();
        let sizes: Vec<&str> = vm
            .find_all("TEMPLATE/DISK")
            .iter()
            .filter_map(|d| d.find("SIZE"))
            .map(|s| s.text())
            .collect();
        assert_eq!(sizes, vec!["100", "250"]);
        assert!(vm.find_all("TEMPLATE/NIC").is_empty());
        assert!(vm.find_all("MISSING/NIC").is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_documents() {
        assert!(Element::parse("").is_err());
        assert!(Element::parse("<VM><ID>1</ID>").is_err());
        assert!(Element::parse("<A/><B/>").is_err());
    }

    #[test]
    fn test_find_all_with_owned_path() {
        let vm = Element::parse(
            "<VM><TEMPLATE><DISK><SIZE>1</SIZE></DISK><DISK><SIZE>2</SIZE></DISK></TEMPLATE></VM>",
        )
        .unwrap();
        let path = format!("TEMPLATE/{}", "DISK");
        let disks = vm.find_all(&path);
        drop(path);
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[1].find("SIZE").unwrap().text(), "2");
        assert_eq!(vm.children_named(&String::from("TEMPLATE")).count(), 1);
    }
}
