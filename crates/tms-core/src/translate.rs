//! Message translation collaborator.
//!
//! The core only needs human-readable text for error payloads; it never
//! branches on translated text, only on the stable codes.

/// Translates a message code plus arguments into human-readable text.
pub trait MessageTranslator: Send + Sync {
	fn translate(&self, code: &str, args: &[&str]) -> String;
}

/// Fallback translator rendering the code together with its arguments.
///
/// Deployments with internationalized messages supply their own
/// implementation.
pub struct DefaultTranslator;

impl MessageTranslator for DefaultTranslator {
	fn translate(&self, code: &str, args: &[&str]) -> String {
		if args.is_empty() {
			code.to_string()
		} else {
			format!("{} [{}]", code, args.join(", "))
		}
	}
}
