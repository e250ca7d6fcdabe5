//! Supported submission languages

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{judge0_languages, languages},
    error::AppError,
};

/// Languages the judging pipeline can execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Cpp,
    C,
    Java,
    JavaScript,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::Cpp,
        Language::C,
        Language::Java,
        Language::JavaScript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => languages::PYTHON,
            Self::Cpp => languages::CPP,
            Self::C => languages::C,
            Self::Java => languages::JAVA,
            Self::JavaScript => languages::JAVASCRIPT,
        }
    }

    /// Judge0 CE language id
    pub fn judge0_id(&self) -> i32 {
        match self {
            Self::Python => judge0_languages::PYTHON,
            Self::Cpp => judge0_languages::CPP,
            Self::C => judge0_languages::C,
            Self::Java => judge0_languages::JAVA,
            Self::JavaScript => judge0_languages::JAVASCRIPT,
        }
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == lowered)
            .ok_or_else(|| {
                AppError::UnsupportedLanguage(format!(
                    "{} (supported: {})",
                    s,
                    languages::ALL.join(", ")
                ))
            })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!(" CPP ".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("javascript".parse::<Language>().unwrap(), Language::JavaScript);
    }

    #[test]
    fn test_parse_unsupported_is_configuration_error() {
        let err = "brainfuck".parse::<Language>().unwrap_err();
        assert!(matches!(err, AppError::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_judge0_ids() {
        assert_eq!(Language::Python.judge0_id(), 71);
        assert_eq!(Language::Cpp.judge0_id(), 54);
        assert_eq!(Language::Java.judge0_id(), 62);
        assert_eq!(Language::JavaScript.judge0_id(), 63);
        assert_eq!(Language::C.judge0_id(), 50);
    }
}
