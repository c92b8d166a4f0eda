/// Associates enumeration values with their names.
///
/// The extension root and the extension additions are separate numbering spaces: PER encodes a
/// root value as its index within the root (sorted by value, ITU-T X.691 14.1) and an addition
/// as its index within the additions (in definition order). Lookups therefore never cross from
/// one space into the other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    root: Vec<(i64, String)>,
    additions: Vec<(i64, String)>,
}

impl ValueMap {
    pub fn new<S: Into<String>, I: IntoIterator<Item = (i64, S)>>(root: I) -> Self {
        let mut root = root
            .into_iter()
            .map(|(value, name)| (value, name.into()))
            .collect::<Vec<_>>();
        root.sort_by_key(|(value, _)| *value);
        Self {
            root,
            additions: Vec::new(),
        }
    }

    pub fn with_additions<S: Into<String>, I: IntoIterator<Item = (i64, S)>>(
        mut self,
        additions: I,
    ) -> Self {
        self.additions = additions
            .into_iter()
            .map(|(value, name)| (value, name.into()))
            .collect();
        self
    }

    #[inline]
    pub fn root_len(&self) -> usize {
        self.root.len()
    }

    #[inline]
    pub fn additions_len(&self) -> usize {
        self.additions.len()
    }

    /// Resolves a PER root index into its value and name
    pub fn root_entry(&self, index: u64) -> Option<(i64, &str)> {
        self.root
            .get(usize::try_from(index).ok()?)
            .map(|(value, name)| (*value, name.as_str()))
    }

    /// Resolves a PER extension addition index into its value and name
    pub fn addition_entry(&self, index: u64) -> Option<(i64, &str)> {
        self.additions
            .get(usize::try_from(index).ok()?)
            .map(|(value, name)| (*value, name.as_str()))
    }

    /// Looks a value up by its semantic value, as carried by BER
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.root
            .iter()
            .chain(self.additions.iter())
            .find(|(v, _)| *v == value)
            .map(|(_, name)| name.as_str())
    }
}

/// Names for the individual bits of a BIT STRING, ITU-T X.680 22.
/// Bit 0 is the most significant bit of the first octet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedBits(Vec<(u64, String)>);

impl NamedBits {
    pub fn new<S: Into<String>, I: IntoIterator<Item = (u64, S)>>(bits: I) -> Self {
        let mut bits = bits
            .into_iter()
            .map(|(bit, name)| (bit, name.into()))
            .collect::<Vec<_>>();
        bits.sort_by_key(|(bit, _)| *bit);
        Self(bits)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.0.iter().map(|(bit, name)| (*bit, name.as_str()))
    }

    /// Extracts every named bit by position. Bits beyond the data are `false`.
    pub fn extract<'a>(&'a self, data: &'a [u8]) -> impl Iterator<Item = (&'a str, bool)> + 'a {
        self.iter().map(move |(bit, name)| {
            let set = usize::try_from(bit / 8)
                .ok()
                .and_then(|byte| data.get(byte))
                .map(|byte| byte & (0x80 >> (bit % 8)) != 0)
                .unwrap_or(false);
            (name, set)
        })
    }
}
