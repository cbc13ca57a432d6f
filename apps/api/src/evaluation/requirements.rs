//! HR requirement profile collected from the form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceBracket {
    #[default]
    #[serde(rename = "0-1 years")]
    UpToOne,
    #[serde(rename = "1-3 years")]
    OneToThree,
    #[serde(rename = "3-5 years")]
    ThreeToFive,
    #[serde(rename = "5+ years")]
    FivePlus,
}

impl ExperienceBracket {
    pub const ALL: [ExperienceBracket; 4] = [
        ExperienceBracket::UpToOne,
        ExperienceBracket::OneToThree,
        ExperienceBracket::ThreeToFive,
        ExperienceBracket::FivePlus,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExperienceBracket::UpToOne => "0-1 years",
            ExperienceBracket::OneToThree => "1-3 years",
            ExperienceBracket::ThreeToFive => "3-5 years",
            ExperienceBracket::FivePlus => "5+ years",
        }
    }
}

impl fmt::Display for ExperienceBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExperienceBracket {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|b| b.label() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown experience bracket '{s}'")))
    }
}

/// Serialized as-is into the fit-evaluation prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HrRequirements {
    pub role: String,
    pub core_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub experience_required: ExperienceBracket,
}

impl HrRequirements {
    pub fn from_form(
        role: &str,
        core_skills: &str,
        soft_skills: &str,
        experience_required: ExperienceBracket,
    ) -> Self {
        Self {
            role: role.trim().to_string(),
            core_skills: split_list(core_skills),
            soft_skills: split_list(soft_skills),
            experience_required,
        }
    }
}

/// Splits a comma-separated list, trimming items and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
