use crate::domain::model::NormalizedFields;
use crate::utils::error::{EtlError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

pub const PROFILE_TAG: &str = "Profile";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{([A-Za-z_][A-Za-z0-9_.\-]*)\}$").expect("valid placeholder pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.children.push(XmlNode::Text(text.into()));
        element
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 只有一個文字子節點時回傳該文字
    pub fn sole_text(&self) -> Option<&str> {
        match self.children.as_slice() {
            [XmlNode::Text(text)] => Some(text),
            _ => None,
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// 依文件順序（先序）尋找第一個指定名稱的元素，包含自身
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(name))
    }
}

/// 佔位符值的來源
pub trait PlaceholderSource {
    fn lookup(&self, key: &str) -> Option<&str>;
}

impl PlaceholderSource for NormalizedFields {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key)
    }
}

impl PlaceholderSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

/// 啟動時載入一次的 XML 模板，之後只讀。
#[derive(Debug, Clone)]
pub struct Template {
    root: XmlElement,
    fragment: XmlElement,
}

impl Template {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_fragment(path, PROFILE_TAG)
    }

    pub fn load_with_fragment<P: AsRef<Path>>(path: P, fragment_tag: &str) -> Result<Self> {
        let location = path.as_ref().display().to_string();
        tracing::info!("Loading XML template: {}", location);

        let source = std::fs::read_to_string(path.as_ref())
            .map_err(|e| load_error(&location, format!("cannot read template: {}", e)))?;
        let template = Self::parse_with_fragment(&source, &location, fragment_tag)?;

        tracing::info!("XML template loaded");
        Ok(template)
    }

    pub fn parse(source: &str) -> Result<Self> {
        Self::parse_with_fragment(source, "<inline>", PROFILE_TAG)
    }

    pub fn parse_with_fragment(source: &str, location: &str, fragment_tag: &str) -> Result<Self> {
        let root = parse_tree(source, location)?;
        let fragment = root.find(fragment_tag).cloned().ok_or_else(|| {
            load_error(location, format!("missing <{}> fragment", fragment_tag))
        })?;
        Ok(Self { root, fragment })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn fragment(&self) -> &XmlElement {
        &self.fragment
    }

    /// 深拷貝片段後填入佔位符，不會修改共用的模板
    pub fn instantiate<P: PlaceholderSource + ?Sized>(&self, values: &P) -> XmlElement {
        let mut element = self.fragment.clone();
        fill_placeholders(&mut element, values);
        element
    }
}

/// 深度優先替換屬性值與唯一文字子節點中的 `${name}`。找不到的鍵保持原樣。
pub fn fill_placeholders<P: PlaceholderSource + ?Sized>(element: &mut XmlElement, values: &P) {
    for (_, value) in element.attributes.iter_mut() {
        if let Some(replacement) = resolve(value, values) {
            *value = replacement;
        }
    }

    if let [XmlNode::Text(text)] = element.children.as_mut_slice() {
        if let Some(replacement) = resolve(text, values) {
            *text = replacement;
        }
    }

    for child in element.children.iter_mut() {
        if let XmlNode::Element(child) = child {
            fill_placeholders(child, values);
        }
    }
}

fn resolve<P: PlaceholderSource + ?Sized>(value: &str, values: &P) -> Option<String> {
    let key = PLACEHOLDER.captures(value)?.get(1)?.as_str();
    values.lookup(key).map(str::to_string)
}

fn load_error(location: &str, reason: impl Into<String>) -> EtlError {
    EtlError::TemplateLoadError {
        location: location.to_string(),
        reason: reason.into(),
    }
}

fn parse_tree(source: &str, location: &str) -> Result<XmlElement> {
    let malformed = |e: &dyn std::fmt::Display| load_error(location, format!("malformed XML: {}", e));

    let mut reader = Reader::from_str(source);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(|e| malformed(&e))? {
            Event::Start(start) => {
                flush_text(&mut text, &mut stack, location)?;
                stack.push(element_from_start(&start, location)?);
            }
            Event::Empty(start) => {
                flush_text(&mut text, &mut stack, location)?;
                let element = element_from_start(&start, location)?;
                attach(element, &mut stack, &mut root, location)?;
            }
            Event::End(_) => {
                flush_text(&mut text, &mut stack, location)?;
                let element = stack
                    .pop()
                    .ok_or_else(|| load_error(location, "unexpected closing tag"))?;
                attach(element, &mut stack, &mut root, location)?;
            }
            Event::Text(raw) => {
                text.push_str(std::str::from_utf8(&raw).map_err(|e| malformed(&e))?);
            }
            Event::GeneralRef(reference) => {
                // 實體參照先保留原文，flush 時統一 unescape
                text.push('&');
                text.push_str(&reference.decode().map_err(|e| malformed(&e))?);
                text.push(';');
            }
            Event::CData(cdata) => {
                let content = std::str::from_utf8(&cdata).map_err(|e| malformed(&e))?;
                text.push_str(&quick_xml::escape::escape(content));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(load_error(location, "unexpected end of document"));
    }
    root.ok_or_else(|| load_error(location, "document has no root element"))
}

fn element_from_start(start: &BytesStart<'_>, location: &str) -> Result<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| load_error(location, format!("invalid element name: {}", e)))?
        .to_string();

    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute =
            attribute.map_err(|e| load_error(location, format!("invalid attribute: {}", e)))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| load_error(location, format!("invalid attribute name: {}", e)))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| load_error(location, format!("invalid attribute value: {}", e)))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// 只含空白的文字節點會被丟棄
fn flush_text(text: &mut String, stack: &mut [XmlElement], location: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let raw = std::mem::take(text);
    if raw.trim().is_empty() {
        return Ok(());
    }

    let value = quick_xml::escape::unescape(&raw)
        .map_err(|e| load_error(location, format!("invalid character reference: {}", e)))?
        .into_owned();
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Text(value));
            Ok(())
        }
        None => Err(load_error(location, "text outside of the root element")),
    }
}

fn attach(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    location: &str,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(load_error(location, "document has more than one root element")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Templates>
    <!-- per-record fragment -->
    <Profile id="${userId}" source="${unknownKey}">
        <Name>${firstName} ${lastName}</Name>
        <FirstName>${firstName}</FirstName>
        <LastName>${lastName}</LastName>
        <Registered>${registerDate}</Registered>
        <Note>Static &amp; kept</Note>
        <Contact><Email/></Contact>
    </Profile>
</Templates>"#;

    fn fields() -> NormalizedFields {
        NormalizedFields {
            user_id: "U1".to_string(),
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            register_date: "2023-01-15T00:00:00Z".to_string(),
        }
    }

    fn child<'a>(element: &'a XmlElement, name: &str) -> &'a XmlElement {
        element.child_elements().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn test_parse_finds_profile_fragment() {
        let template = Template::parse(TEMPLATE).unwrap();
        assert_eq!(template.root().name, "Templates");
        assert_eq!(template.fragment().name, "Profile");
        assert_eq!(template.fragment().attribute("id"), Some("${userId}"));
        // 只有空白的文字節點不保留
        assert_eq!(template.fragment().children.len(), 6);
        assert_eq!(child(template.fragment(), "Note").sole_text(), Some("Static & kept"));
    }

    #[test]
    fn test_missing_profile_is_a_load_error() {
        let err = Template::parse("<Templates><Other/></Templates>").unwrap_err();
        assert!(matches!(err, EtlError::TemplateLoadError { .. }));
    }

    #[test]
    fn test_malformed_xml_is_a_load_error() {
        for source in ["<Templates><Profile></Templates>", "<Profile>", "", "<a/><b/>"] {
            assert!(
                matches!(Template::parse(source), Err(EtlError::TemplateLoadError { .. })),
                "{:?} should fail",
                source
            );
        }
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let err = Template::load("/definitely/not/here/profile.xml").unwrap_err();
        assert!(matches!(err, EtlError::TemplateLoadError { .. }));
    }

    #[test]
    fn test_instantiate_substitutes_known_placeholders() {
        let template = Template::parse(TEMPLATE).unwrap();
        let profile = template.instantiate(&fields());

        assert_eq!(profile.attribute("id"), Some("U1"));
        assert_eq!(child(&profile, "FirstName").sole_text(), Some("John"));
        assert_eq!(child(&profile, "LastName").sole_text(), Some("Smith"));
        assert_eq!(
            child(&profile, "Registered").sole_text(),
            Some("2023-01-15T00:00:00Z")
        );
    }

    #[test]
    fn test_unknown_and_compound_placeholders_pass_through() {
        let template = Template::parse(TEMPLATE).unwrap();
        let profile = template.instantiate(&fields());

        assert_eq!(profile.attribute("source"), Some("${unknownKey}"));
        assert_eq!(
            child(&profile, "Name").sole_text(),
            Some("${firstName} ${lastName}")
        );
    }

    #[test]
    fn test_instantiate_does_not_mutate_template() {
        let template = Template::parse(TEMPLATE).unwrap();
        let before = template.fragment().clone();
        let _ = template.instantiate(&fields());
        assert_eq!(template.fragment(), &before);
    }

    #[test]
    fn test_hash_map_placeholder_source() {
        let template = Template::parse(r#"<Profile id="${userId}"><Id>${userId}</Id></Profile>"#).unwrap();
        let mut values = HashMap::new();
        values.insert("userId".to_string(), "U1".to_string());

        let profile = template.instantiate(&values);
        assert_eq!(profile.attribute("id"), Some("U1"));
        assert_eq!(child(&profile, "Id").sole_text(), Some("U1"));
    }

    #[test]
    fn test_nested_placeholders_are_filled_depth_first() {
        let mut element = XmlElement::new("Profile");
        let mut outer = XmlElement::new("Outer");
        let mut inner = XmlElement::with_text("Inner", "${lastName}");
        inner.attributes.push(("first".to_string(), "${firstName}".to_string()));
        outer.children.push(XmlNode::Element(inner));
        element.children.push(XmlNode::Element(outer));

        fill_placeholders(&mut element, &fields());

        let inner = child(child(&element, "Outer"), "Inner");
        assert_eq!(inner.attribute("first"), Some("John"));
        assert_eq!(inner.sole_text(), Some("Smith"));
    }
}
