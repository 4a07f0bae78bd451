use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A model identifier accepted by the hosted endpoint.
///
/// This can be a well-known model or a custom string for models that were
/// added after this list was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Models known to be served by Groq.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KnownModel {
    /// Llama 3.3 70B, versatile tier.
    Llama3370bVersatile,

    /// Llama 3.1 8B, instant tier.
    Llama318bInstant,

    /// Gemma 2 9B instruction tuned.
    Gemma29bIt,

    /// GPT-OSS 120B.
    GptOss120b,

    /// GPT-OSS 20B.
    GptOss20b,
}

impl KnownModel {
    /// All known models, in the order they are listed to users.
    pub const ALL: [KnownModel; 5] = [
        KnownModel::Llama3370bVersatile,
        KnownModel::Llama318bInstant,
        KnownModel::Gemma29bIt,
        KnownModel::GptOss120b,
        KnownModel::GptOss20b,
    ];

    /// The identifier sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            KnownModel::Llama3370bVersatile => "llama-3.3-70b-versatile",
            KnownModel::Llama318bInstant => "llama-3.1-8b-instant",
            KnownModel::Gemma29bIt => "gemma2-9b-it",
            KnownModel::GptOss120b => "openai/gpt-oss-120b",
            KnownModel::GptOss20b => "openai/gpt-oss-20b",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Llama3370bVersatile)
    }
}

impl Model {
    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Model::Known(known) => known.as_str(),
            Model::Custom(custom) => custom,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(KnownModel::ALL
            .iter()
            .find(|known| known.as_str() == s)
            .map(|known| Model::Known(*known))
            .unwrap_or_else(|| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        match model.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::from(model.to_string())
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Model::from(s))
    }
}
