use std::collections::HashMap;

/// A social link as it appears in the source literal.
///
/// `Cleared` (the literal `undefined`) and `NotMentioned` (no key at all) are
/// kept apart here even though the default patch renders both as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SocialField {
    Present(String),
    Cleared,
    #[default]
    NotMentioned,
}

impl SocialField {
    /// Value written into the target file
    pub fn patch_value(&self) -> &str {
        match self {
            SocialField::Present(value) => value,
            SocialField::Cleared | SocialField::NotMentioned => "",
        }
    }

    pub fn is_mentioned(&self) -> bool {
        !matches!(self, SocialField::NotMentioned)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Socials {
    pub x: SocialField,
    pub discord: SocialField,
}

/// One app record pulled out of the source literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub name: String,
    pub website: Option<String>,
    pub socials: Socials,
}

impl ExtractedRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: None,
            socials: Socials::default(),
        }
    }
}

/// Lookup table from app name to record.
///
/// Later records replace earlier ones with the same name; every replaced
/// name is remembered so the caller can report it.
#[derive(Debug, Default)]
pub struct ExtractedRecordIndex {
    records: HashMap<String, ExtractedRecord>,
    duplicates: Vec<String>,
}

impl ExtractedRecordIndex {
    pub fn from_records(records: &[ExtractedRecord]) -> Self {
        records.iter().cloned().collect()
    }

    pub fn insert(&mut self, record: ExtractedRecord) {
        if let Some(previous) = self.records.insert(record.name.clone(), record) {
            self.duplicates.push(previous.name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ExtractedRecord> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Names that appeared more than once, in the order the repeats were seen
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }
}

impl FromIterator<ExtractedRecord> for ExtractedRecordIndex {
    fn from_iter<I: IntoIterator<Item = ExtractedRecord>>(iter: I) -> Self {
        let mut index = Self::default();
        for record in iter {
            index.insert(record);
        }
        index
    }
}
