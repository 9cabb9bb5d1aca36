//! XML form of a package tree.
//!
//! ```xml
//! <TestPackage id="1" fullname="/work/tests/unit.dll">
//!   <Settings>
//!     <Setting name="SkipNonTestUnits" type="bool" value="true"/>
//!     <Setting name="TargetFramework" type="string" value="native"/>
//!   </Settings>
//!   <TestPackage id="2" fullname="/work/tests/other.dll"/>
//! </TestPackage>
//! ```
//!
//! Each `Setting` records its value type, so a string such as `"8"` reads back as a string.
//! Settings given as attributes of `Settings` are also accepted; their types are inferred
//! from the text.

use std::io;
use std::string::FromUtf8Error;

use camino::Utf8PathBuf;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::id::PackageId;
use crate::node::PackageNode;
use crate::setting::{PackageSettings, SettingValue};

const PACKAGE_ELEMENT: &str = "TestPackage";
const SETTINGS_ELEMENT: &str = "Settings";
const SETTING_ELEMENT: &str = "Setting";
const ID_ATTRIBUTE: &str = "id";
const FULL_NAME_ATTRIBUTE: &str = "fullname";
const NAME_ATTRIBUTE: &str = "name";
const TYPE_ATTRIBUTE: &str = "type";
const VALUE_ATTRIBUTE: &str = "value";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("encoded package is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// The package XML could not be turned into a package tree.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("malformed package XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute in package XML: {0}")]
    Attribute(#[from] AttrError),

    #[error("no `<TestPackage>` element found")]
    MissingPackage,

    #[error("`<TestPackage>` element is missing the `id` attribute")]
    MissingId,

    #[error("`<Setting>` element is missing the `{attribute}` attribute")]
    MissingSettingAttribute { attribute: &'static str },

    #[error("setting `{name}` has the value `{value}`, which is not a valid {kind}")]
    InvalidSettingValue {
        name: String,
        kind: String,
        value: String,
    },

    #[error("unexpected element `<{name}>` in package XML")]
    UnexpectedElement { name: String },

    #[error("unexpected {kind} in package XML")]
    UnexpectedNode { kind: &'static str },

    #[error("input ended before package `{id}` was closed")]
    UnexpectedEof { id: PackageId },
}

/// Serializes `package` and its whole subtree.
pub fn to_xml(package: &PackageNode) -> Result<String, EncodeError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_package(&mut writer, package)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_package(writer: &mut Writer<Vec<u8>>, package: &PackageNode) -> Result<(), EncodeError> {
    let mut start = BytesStart::new(PACKAGE_ELEMENT);
    start.push_attribute((ID_ATTRIBUTE, package.id().as_str()));
    if let Some(full_name) = package.full_name() {
        start.push_attribute((FULL_NAME_ATTRIBUTE, full_name.as_str()));
    }

    if package.settings().is_empty() && package.sub_packages().is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start.borrow()))?;

    if !package.settings().is_empty() {
        write_settings(writer, package.settings())?;
    }

    for sub_package in package.sub_packages() {
        write_package(writer, sub_package)?;
    }

    writer.write_event(Event::End(BytesEnd::new(PACKAGE_ELEMENT)))?;
    Ok(())
}

fn write_settings(writer: &mut Writer<Vec<u8>>, settings: &PackageSettings) -> Result<(), EncodeError> {
    writer.write_event(Event::Start(BytesStart::new(SETTINGS_ELEMENT)))?;

    for (name, value) in settings {
        let text = value.to_string();
        let mut element = BytesStart::new(SETTING_ELEMENT);
        element.push_attribute((NAME_ATTRIBUTE, name.as_str()));
        element.push_attribute((TYPE_ATTRIBUTE, value.type_name()));
        element.push_attribute((VALUE_ATTRIBUTE, text.as_str()));
        writer.write_event(Event::Empty(element))?;
    }

    writer.write_event(Event::End(BytesEnd::new(SETTINGS_ELEMENT)))?;
    Ok(())
}

/// The elements a package file is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Package,
    Settings,
    Setting,
}

impl Element {
    fn of(start: &BytesStart<'_>) -> Result<Self, FormatError> {
        match start.name().as_ref() {
            name if name == PACKAGE_ELEMENT.as_bytes() => Ok(Self::Package),
            name if name == SETTINGS_ELEMENT.as_bytes() => Ok(Self::Settings),
            name if name == SETTING_ELEMENT.as_bytes() => Ok(Self::Setting),
            _ => Err(unexpected_element(start)),
        }
    }
}

/// Parses a package tree.
///
/// Each node takes its settings from its own `Settings` block only; nothing is
/// propagated while reading.
pub fn from_xml(text: &str) -> Result<PackageNode, FormatError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let package = loop {
        match reader.read_event()? {
            Event::Start(element) => {
                expect_package_element(&element)?;
                break read_package(&mut reader, &element, true)?;
            }
            Event::Empty(element) => {
                expect_package_element(&element)?;
                break read_package(&mut reader, &element, false)?;
            }
            Event::Decl(_) | Event::Comment(_) | Event::DocType(_) => {}
            Event::Eof => return Err(FormatError::MissingPackage),
            other => return Err(unexpected_node(&other)),
        }
    };

    loop {
        match reader.read_event()? {
            Event::Eof => {
                tracing::trace!("Decoded package {}", package.id());
                return Ok(package);
            }
            Event::Comment(_) => {}
            Event::Start(element) | Event::Empty(element) => {
                return Err(unexpected_element(&element));
            }
            other => return Err(unexpected_node(&other)),
        }
    }
}

fn read_package(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    has_children: bool,
) -> Result<PackageNode, FormatError> {
    let mut id = None;
    let mut full_name = None;

    for attribute in start.attributes() {
        let attribute = attribute?;
        let value = attribute.unescape_value()?;
        match attribute.key.as_ref() {
            key if key == ID_ATTRIBUTE.as_bytes() => id = Some(PackageId::new(value)),
            key if key == FULL_NAME_ATTRIBUTE.as_bytes() => {
                full_name = Some(Utf8PathBuf::from(value.into_owned()));
            }
            _ => {}
        }
    }

    let id = id.ok_or(FormatError::MissingId)?;
    let mut package = PackageNode::with_id(id, full_name);

    if !has_children {
        return Ok(package);
    }

    loop {
        let (element, has_children) = match reader.read_event()? {
            Event::Start(element) => (element, true),
            Event::Empty(element) => (element, false),
            Event::End(_) => return Ok(package),
            Event::Comment(_) => continue,
            Event::Eof => {
                return Err(FormatError::UnexpectedEof {
                    id: package.id().clone(),
                });
            }
            other => return Err(unexpected_node(&other)),
        };

        match Element::of(&element)? {
            Element::Settings => {
                read_settings(reader, &element, has_children, &mut package)?;
            }
            Element::Package => {
                let sub_package = read_package(reader, &element, has_children)?;
                package.push_sub_package(sub_package);
            }
            Element::Setting => return Err(unexpected_element(&element)),
        }
    }
}

fn read_settings(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    has_children: bool,
    package: &mut PackageNode,
) -> Result<(), FormatError> {
    for attribute in start.attributes() {
        let attribute = attribute?;
        let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?;
        package
            .settings_mut()
            .insert(name, SettingValue::parse_typed(&value));
    }

    if !has_children {
        return Ok(());
    }

    loop {
        let (element, has_children) = match reader.read_event()? {
            Event::Start(element) => (element, true),
            Event::Empty(element) => (element, false),
            Event::End(_) => return Ok(()),
            Event::Comment(_) => continue,
            Event::Eof => {
                return Err(FormatError::UnexpectedEof {
                    id: package.id().clone(),
                });
            }
            other => return Err(unexpected_node(&other)),
        };

        if Element::of(&element)? != Element::Setting {
            return Err(unexpected_element(&element));
        }

        let (name, value) = read_setting(&element)?;
        package.settings_mut().insert(name, value);

        if has_children {
            expect_end(reader, package.id())?;
        }
    }
}

fn read_setting(element: &BytesStart<'_>) -> Result<(String, SettingValue), FormatError> {
    let mut name = None;
    let mut kind = None;
    let mut text = None;

    for attribute in element.attributes() {
        let attribute = attribute?;
        let value = attribute.unescape_value()?.into_owned();
        match attribute.key.as_ref() {
            key if key == NAME_ATTRIBUTE.as_bytes() => name = Some(value),
            key if key == TYPE_ATTRIBUTE.as_bytes() => kind = Some(value),
            key if key == VALUE_ATTRIBUTE.as_bytes() => text = Some(value),
            _ => {}
        }
    }

    let name = name.ok_or(FormatError::MissingSettingAttribute {
        attribute: NAME_ATTRIBUTE,
    })?;
    let text = text.ok_or(FormatError::MissingSettingAttribute {
        attribute: VALUE_ATTRIBUTE,
    })?;

    let value = match kind.as_deref() {
        None => Some(SettingValue::String(text.clone())),
        Some(kind) => SettingValue::from_typed_text(kind, &text),
    };

    match value {
        Some(value) => Ok((name, value)),
        None => Err(FormatError::InvalidSettingValue {
            name,
            kind: kind.unwrap_or_default(),
            value: text,
        }),
    }
}

/// Elements of a package file carry no content of their own.
fn expect_end(reader: &mut Reader<&[u8]>, owner: &PackageId) -> Result<(), FormatError> {
    loop {
        match reader.read_event()? {
            Event::End(_) => return Ok(()),
            Event::Comment(_) => {}
            Event::Eof => return Err(FormatError::UnexpectedEof { id: owner.clone() }),
            Event::Start(element) | Event::Empty(element) => {
                return Err(unexpected_element(&element));
            }
            other => return Err(unexpected_node(&other)),
        }
    }
}

fn expect_package_element(element: &BytesStart<'_>) -> Result<(), FormatError> {
    match Element::of(element)? {
        Element::Package => Ok(()),
        Element::Settings | Element::Setting => Err(unexpected_element(element)),
    }
}

fn unexpected_element(element: &BytesStart<'_>) -> FormatError {
    FormatError::UnexpectedElement {
        name: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
    }
}

fn unexpected_node(event: &Event<'_>) -> FormatError {
    let kind = match event {
        Event::Start(_) | Event::Empty(_) => "element",
        Event::End(_) => "closing tag",
        Event::Text(_) => "text",
        Event::CData(_) => "CDATA section",
        Event::Comment(_) => "comment",
        Event::Decl(_) => "XML declaration",
        Event::PI(_) => "processing instruction",
        Event::DocType(_) => "doctype",
        Event::Eof => "end of input",
    };
    FormatError::UnexpectedNode { kind }
}
