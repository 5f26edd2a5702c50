use crate::core::template::{XmlElement, XmlNode};
use crate::utils::error::{EtlError, Result};
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

const INDENT_SIZE: usize = 4;

/// 將組好的文件樹序列化為 UTF-8 字串：含 XML 宣告、4 空白縮排、首尾空白去除。
///
/// 相鄰文字節點會合併，空白文字節點不輸出，同一棵樹必定得到相同的字串。
pub fn render_document(root: &XmlElement) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(render_error)?;
    write_element(&mut writer, root)?;

    let bytes = writer.into_inner();
    let xml = String::from_utf8(bytes).map_err(render_error)?;
    Ok(xml.trim().to_string())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let children = normalized_children(element);
    if children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(render_error)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(render_error)?;
    for child in children {
        match child {
            // 文字內容只跳脫 `<`、`>`、`&`，引號原樣輸出
            Child::Text(text) => writer
                .write_event(Event::Text(BytesText::from_escaped(partial_escape(&text))))
                .map_err(render_error)?,
            Child::Element(child) => write_element(writer, child)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(render_error)?;
    Ok(())
}

enum Child<'a> {
    Text(String),
    Element(&'a XmlElement),
}

/// 合併相鄰文字並略過只有空白的文字
fn normalized_children(element: &XmlElement) -> Vec<Child<'_>> {
    let mut children = Vec::with_capacity(element.children.len());
    let mut pending = String::new();

    for node in &element.children {
        match node {
            XmlNode::Text(text) => pending.push_str(text),
            XmlNode::Element(child) => {
                push_text(&mut children, &mut pending);
                children.push(Child::Element(child));
            }
        }
    }
    push_text(&mut children, &mut pending);
    children
}

fn push_text(children: &mut Vec<Child<'_>>, pending: &mut String) {
    let text = std::mem::take(pending);
    if !text.trim().is_empty() {
        children.push(Child::Text(text));
    }
}

fn render_error(e: impl std::fmt::Display) -> EtlError {
    EtlError::RenderError {
        message: e.to_string(),
    }
}
