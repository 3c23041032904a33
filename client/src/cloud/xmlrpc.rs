//! Minimal XML-RPC encoding for the cloud API
//!
//! Requests are `methodCall` documents with scalar parameters. Every response
//! of the API is an array `[success, body, error_code]`: on success `body` is an
//! XML document describing the requested resources, otherwise it is an error
//! message.

use std::fmt::Write;

use quick_xml::escape::escape;

use super::CloudError;
use crate::resource::Element;

/// Scalar request parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(i64),
    Str(String),
}

/// Encode a `methodCall` document
pub fn method_call(method: &str, params: &[Param]) -> String {
    let mut body = String::from("<?xml version=\"1.0\"?><methodCall>");
    let _ = write!(body, "<methodName>{}</methodName><params>", escape(method));
    for param in params {
        let value = match param {
            Param::Int(v) => format!("<int>{v}</int>"),
            Param::Str(v) => format!("<string>{}</string>", escape(v.as_str())),
        };
        let _ = write!(body, "<param><value>{value}</value></param>");
    }
    body.push_str("</params></methodCall>");
    body
}

/// Decode a `methodResponse` and return the body of a successful call
pub fn parse_response(method: &str, xml: &str) -> Result<String, CloudError> {
    let response =
        Element::parse(xml).map_err(|e| CloudError::Response(format!("{method}: {e}")))?;

    if let Some(fault) = response.find("fault/value/struct") {
        let message = fault
            .children_named("member")
            .find(|m| m.find("name").is_some_and(|n| n.text() == "faultString"))
            .and_then(|m| m.find("value"))
            .map(scalar_text)
            .unwrap_or_default();
        return Err(CloudError::Fault {
            method: method.to_string(),
            message: message.to_string(),
        });
    }

    let values: Vec<&Element> = response
        .find("params/param/value/array/data")
        .map(|data| data.children_named("value").collect())
        .ok_or_else(|| CloudError::Response(format!("{method}: missing result array")))?;

    let success = values
        .first()
        .map(|v| matches!(scalar_text(v), "1" | "true"))
        .ok_or_else(|| CloudError::Response(format!("{method}: empty result array")))?;
    let body = values
        .get(1)
        .map(|v| scalar_text(v).to_string())
        .unwrap_or_default();

    if success {
        Ok(body)
    } else {
        Err(CloudError::Fault {
            method: method.to_string(),
            message: body,
        })
    }
}

/// Text of a `<value>`, with or without an explicit type element
fn scalar_text(value: &Element) -> &str {
    match value.children().first() {
        Some(typed) => typed.text(),
        None => value.text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><methodResponse><params><param><value><array><data>\
             <value><boolean>1</boolean></value>\
             <value><string>{}</string></value>\
             <value><i4>0</i4></value>\
             </data></array></value></param></params></methodResponse>",
            escape(body)
        )
    }

    #[test]
    fn test_method_call_encoding() {
        let xml = method_call(
            "one.vmpool.info",
            &[Param::Str("oneadmin:p<w>".to_string()), Param::Int(-2)],
        );
        assert!(xml.contains("<methodName>one.vmpool.info</methodName>"));
        assert!(xml.contains("<value><string>oneadmin:p&lt;w&gt;</string></value>"));
        assert!(xml.contains("<value><int>-2</int></value>"));
    }

    #[test]
    fn test_parse_successful_response() {
        let body = parse_response("one.vm.info", &success("<VM><ID>1</ID></VM>")).unwrap();
        assert_eq!(body, "<VM><ID>1</ID></VM>");
    }

    #[test]
    fn test_parse_failed_call() {
        let xml = "<methodResponse><params><param><value><array><data>\
                   <value><boolean>0</boolean></value>\
                   <value><string>[one.vm.info] User couldn't be authenticated</string></value>\
                   <value><i4>256</i4></value>\
                   </data></array></value></param></params></methodResponse>";
        match parse_response("one.vm.info", xml) {
            Err(CloudError::Fault { method, message }) => {
                assert_eq!(method, "one.vm.info");
                assert!(message.contains("authenticated"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_untyped_value_and_fault() {
        let xml = "<methodResponse><fault><value><struct>\
                   <member><name>faultCode</name><value><int>-1</int></value></member>\
                   <member><name>faultString</name><value>no such method</value></member>\
                   </struct></value></fault></methodResponse>";
        match parse_response("one.nope", xml) {
            Err(CloudError::Fault { message, .. }) => assert_eq!(message, "no such method"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed_response() {
        assert!(matches!(
            parse_response("one.vm.info", "<methodResponse/>"),
            Err(CloudError::Response(_))
        ));
        assert!(matches!(
            parse_response("one.vm.info", "not xml"),
            Err(CloudError::Response(_))
        ));
    }
}
