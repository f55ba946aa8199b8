//! Row representation

use super::datum::Datum;

/// A row of values flowing between operators
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Row {
    values: Vec<Datum>,
}

impl Row {
    pub fn new(values: Vec<Datum>) -> Self {
        Row { values }
    }

    pub fn empty() -> Self {
        Row { values: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Datum> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Datum] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Datum> {
        self.values
    }

    /// Concatenate two rows (join output)
    pub fn concat(mut self, other: Row) -> Row {
        self.values.extend(other.values);
        self
    }

    /// Keep only the given column positions, in order
    pub fn project(&self, indexes: &[usize]) -> Row {
        Row {
            values: indexes
                .iter()
                .filter_map(|&i| self.values.get(i).cloned())
                .collect(),
        }
    }
}

impl From<Vec<Datum>> for Row {
    fn from(values: Vec<Datum>) -> Self {
        Row { values }
    }
}

impl IntoIterator for Row {
    type Item = Datum;
    type IntoIter = std::vec::IntoIter<Datum>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
