//! Policy languages: from document text to a compiled [`Policy`].

use crate::compiler;
use crate::document::SignedPolicy;
use crate::error::Result;
use crate::policy::Policy;

/// A textual policy language.
pub trait PolicyLanguage: Send + Sync {
    /// Parsed, not yet compiled, document.
    type Document;

    /// Identifier of the language, e.g. `ucon_lang_v1`.
    fn id(&self) -> &str;

    fn deserialize(&self, text: &str) -> Result<Self::Document>;

    fn translate(&self, document: &Self::Document) -> Result<Policy>;

    /// Deserializes and translates in one step.
    fn compile(&self, text: &str) -> Result<Policy> {
        self.translate(&self.deserialize(text)?)
    }
}

/// The JSON document language, reading signed policy documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPolicyLanguage;

impl JsonPolicyLanguage {
    pub const ID: &'static str = "ucon_lang_v1";
}

impl PolicyLanguage for JsonPolicyLanguage {
    type Document = SignedPolicy;

    fn id(&self) -> &str {
        Self::ID
    }

    fn deserialize(&self, text: &str) -> Result<SignedPolicy> {
        Ok(serde_json::from_str(text)?)
    }

    fn translate(&self, document: &SignedPolicy) -> Result<Policy> {
        compiler::compile(&document.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    #[test]
    fn compiles_signed_document() {
        let text = r#"{
            "signature": "sig",
            "policy": {
                "id": "p1",
                "issuer": "acme",
                "rights": ["read"],
                "preAccess": { "predicates": [
                    { "type": "custom", "functor": "member",
                      "args": [ { "type": "lString", "value": "x" },
                                { "type": "resolveStringList", "pip": "objects",
                                  "attr": "$OBJECT.tags" } ] }
                ] }
            }
        }"#;

        let language = JsonPolicyLanguage;
        let document = language.deserialize(text).unwrap();
        assert_eq!(document.signature, "sig");
        assert_eq!(document.policy.issuer, "acme");

        let policy = language.translate(&document).unwrap();
        assert_eq!(
            policy.pre_access.to_string(),
            "(resolve_string_list('objects:$OBJECT.tags', _V1), member(x, _V1))"
        );
        assert_eq!(language.id(), "ucon_lang_v1");
    }

    #[test]
    fn malformed_text_is_a_deserialize_error() {
        let result = JsonPolicyLanguage.compile("{ \"policy\": 3 }");
        assert!(matches!(result, Err(CompileError::Deserialize(_))));
    }
}
