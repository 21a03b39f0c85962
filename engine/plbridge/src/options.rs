#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Functor names and switches that steer the codec.
///
/// Unknown keys are ignored both by [`CodecOptions::from_pairs`] and by the
/// serde representation, so newer callers can pass options older versions do
/// not understand.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecOptions {
    pub realvec: String,
    pub realmat: String,
    pub intvec: String,
    pub intmat: String,
    pub charvec: String,
    pub charmat: String,
    pub boolvec: String,
    pub boolmat: String,
    /// Collapse length-1 vectors to bare scalars.
    pub scalar: bool,
    /// Encode variables as atoms named after the host variable. Display only.
    pub atomize: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            realvec: "#".into(),
            realmat: "##".into(),
            intvec: "%".into(),
            intmat: "%%".into(),
            charvec: "$$".into(),
            charmat: "$$$".into(),
            boolvec: "!".into(),
            boolmat: "!!".into(),
            scalar: true,
            atomize: false,
        }
    }
}

/// A value in a key/value option list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    Tag(String),
    Flag(bool),
}

impl From<&str> for OptionValue {
    fn from(tag: &str) -> Self {
        OptionValue::Tag(tag.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(tag: String) -> Self {
        OptionValue::Tag(tag)
    }
}

impl From<bool> for OptionValue {
    fn from(flag: bool) -> Self {
        OptionValue::Flag(flag)
    }
}

/// Which vector or matrix a compound functor stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    RealVec,
    RealMat,
    IntVec,
    IntMat,
    CharVec,
    CharMat,
    BoolVec,
    BoolMat,
}

impl CodecOptions {
    /// Start from the defaults and apply `pairs` in order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            options.set(key.as_ref(), value.into());
        }
        options
    }

    /// Apply a single option. Returns `false` when the key or the value kind
    /// is not recognised; the options are left unchanged in that case.
    pub fn set(&mut self, key: &str, value: OptionValue) -> bool {
        match (key, value) {
            ("scalar", OptionValue::Flag(flag)) => self.scalar = flag,
            ("atomize", OptionValue::Flag(flag)) => self.atomize = flag,
            (key, OptionValue::Tag(tag)) => match self.tag_slot(key) {
                Some(slot) => *slot = tag,
                None => return false,
            },
            _ => return false,
        }
        true
    }

    fn tag_slot(&mut self, key: &str) -> Option<&mut String> {
        Some(match key {
            "realvec" => &mut self.realvec,
            "realmat" => &mut self.realmat,
            "intvec" => &mut self.intvec,
            "intmat" => &mut self.intmat,
            "charvec" => &mut self.charvec,
            "charmat" => &mut self.charmat,
            "boolvec" => &mut self.boolvec,
            "boolmat" => &mut self.boolmat,
            _ => return None,
        })
    }

    pub fn with_scalar(mut self, scalar: bool) -> Self {
        self.scalar = scalar;
        self
    }

    pub fn with_atomize(mut self, atomize: bool) -> Self {
        self.atomize = atomize;
        self
    }

    /// Classify a functor against the configured tags.
    ///
    /// Tags are user-configurable and may collide; the first match in the
    /// order realvec, realmat, intvec, intmat, charvec, charmat, boolvec,
    /// boolmat wins.
    pub fn classify(&self, functor: &str) -> Option<TagKind> {
        [
            (&self.realvec, TagKind::RealVec),
            (&self.realmat, TagKind::RealMat),
            (&self.intvec, TagKind::IntVec),
            (&self.intmat, TagKind::IntMat),
            (&self.charvec, TagKind::CharVec),
            (&self.charmat, TagKind::CharMat),
            (&self.boolvec, TagKind::BoolVec),
            (&self.boolmat, TagKind::BoolMat),
        ]
        .into_iter()
        .find(|(tag, _)| tag.as_str() == functor)
        .map(|(_, kind)| kind)
    }
}
