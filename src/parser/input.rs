use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use tracing::debug;

use crate::error::{
    Diagnostic, Result, XmlError, XmlErrorDomain, XmlErrorLevel, XmlParserErrors,
};

use super::{ParseOptions, XmlParserOption};

pub(super) struct Decoded {
    pub(super) text: String,
    pub(super) diagnostics: Vec<Diagnostic>,
}

fn unsupported(label: &str) -> XmlError {
    XmlError::Syntax(Diagnostic::new(
        XmlErrorDomain::Parser,
        XmlParserErrors::XmlErrUnsupportedEncoding,
        XmlErrorLevel::Fatal,
        format!("Unsupported encoding: {label}"),
    ))
}

/// Guess a UTF-16 encoding from the first characters, `<?` expected.
fn detect_utf16(bytes: &[u8]) -> Option<&'static Encoding> {
    match bytes {
        [0x3C, 0x00, 0x3F, 0x00, ..] => Some(UTF_16LE),
        [0x00, 0x3C, 0x00, 0x3F, ..] => Some(UTF_16BE),
        _ => None,
    }
}

/// Read the `encoding` pseudo-attribute of an XML declaration written in an ASCII compatible
/// encoding.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = bytes.strip_prefix(b"<?xml")?;
    let end = head.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&head[..end]).ok()?;
    let pos = decl.find("encoding")?;
    let rest = decl[pos + "encoding".len()..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|&c| c == '"' || c == '\'')?;
    let value = &rest[1..];
    let end = value.find(quote)?;
    Some(value[..end].to_owned())
}

pub(super) fn decode(bytes: &[u8], options: &ParseOptions) -> Result<Decoded> {
    let (encoding, skip) = if let Some((encoding, len)) = Encoding::for_bom(bytes) {
        (encoding, len)
    } else if let Some(label) = options.encoding.as_deref() {
        let encoding =
            Encoding::for_label(label.as_bytes()).ok_or_else(|| unsupported(label))?;
        (encoding, 0)
    } else if let Some(encoding) = detect_utf16(bytes) {
        (encoding, 0)
    } else if let Some(label) = declared_encoding(bytes)
        .filter(|_| !options.has(XmlParserOption::XmlParseIgnoreEnc))
    {
        let encoding =
            Encoding::for_label(label.as_bytes()).ok_or_else(|| unsupported(&label))?;
        // a declaration read as ASCII cannot describe a UTF-16 document
        let encoding = if encoding == UTF_16LE || encoding == UTF_16BE {
            UTF_8
        } else {
            encoding
        };
        (encoding, 0)
    } else {
        (UTF_8, 0)
    };

    let (text, malformed) = encoding.decode_without_bom_handling(&bytes[skip..]);
    debug!(encoding = encoding.name(), malformed, "decoded input");
    let mut diagnostics = vec![];
    if malformed {
        diagnostics.push(Diagnostic::new(
            XmlErrorDomain::Parser,
            XmlParserErrors::XmlErrInvalidChar,
            XmlErrorLevel::Error,
            format!(
                "Input is not proper {}, indicate encoding !",
                encoding.name()
            ),
        ));
    }
    Ok(Decoded {
        text: text.into_owned(),
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_encoding_is_read() {
        assert_eq!(
            declared_encoding(b"<?xml version='1.0' encoding = 'ISO-8859-1'?><a/>").as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(declared_encoding(b"<?xml version='1.0'?><a/>"), None);
        assert_eq!(declared_encoding(b"<a/>"), None);
    }

    #[test]
    fn byte_order_mark_wins() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<a/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode(&bytes, &ParseOptions::default()).unwrap();
        assert_eq!(decoded.text, "<a/>");
    }

    #[test]
    fn latin1_declaration() {
        let decoded = decode(
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>\xe9</a>",
            &ParseOptions::default(),
        )
        .unwrap();
        assert!(decoded.text.ends_with("<a>\u{e9}</a>"));
        assert!(decoded.diagnostics.is_empty());
    }

    #[test]
    fn unknown_encoding_is_fatal() {
        let options = ParseOptions {
            encoding: Some("no-such-encoding".to_owned()),
            ..Default::default()
        };
        assert!(decode(b"<a/>", &options).is_err());
    }
}
