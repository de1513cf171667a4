use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Letter grade of a composite health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter, Serialize, Deserialize)]
pub enum Grade {
    #[strum(serialize = "F")]
    #[serde(rename = "F")]
    F,
    #[strum(serialize = "E")]
    #[serde(rename = "E")]
    E,
    #[strum(serialize = "E+")]
    #[serde(rename = "E+")]
    EPlus,
    #[strum(serialize = "D")]
    #[serde(rename = "D")]
    D,
    #[strum(serialize = "D+")]
    #[serde(rename = "D+")]
    DPlus,
    #[strum(serialize = "C")]
    #[serde(rename = "C")]
    C,
    #[strum(serialize = "C+")]
    #[serde(rename = "C+")]
    CPlus,
    #[strum(serialize = "B")]
    #[serde(rename = "B")]
    B,
    #[strum(serialize = "B+")]
    #[serde(rename = "B+")]
    BPlus,
    #[strum(serialize = "A")]
    #[serde(rename = "A")]
    A,
    #[strum(serialize = "A+")]
    #[serde(rename = "A+")]
    APlus,
    #[strum(serialize = "S")]
    #[serde(rename = "S")]
    S,
    #[strum(serialize = "S+")]
    #[serde(rename = "S+")]
    SPlus,
}

/// A total must strictly exceed the threshold to earn the grade.
const LADDER: [(f64, Grade); 12] = [
    (91.0, Grade::SPlus),
    (84.0, Grade::S),
    (77.0, Grade::APlus),
    (70.0, Grade::A),
    (63.0, Grade::BPlus),
    (56.0, Grade::B),
    (49.0, Grade::CPlus),
    (42.0, Grade::C),
    (35.0, Grade::DPlus),
    (28.0, Grade::D),
    (21.0, Grade::EPlus),
    (14.0, Grade::E),
];

impl Grade {
    #[must_use]
    pub fn from_total(total: f64) -> Self {
        LADDER
            .iter()
            .find(|(threshold, _)| total > *threshold)
            .map_or(Self::F, |(_, grade)| *grade)
    }

    /// Position on the ladder, `F` being 0.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }
}
