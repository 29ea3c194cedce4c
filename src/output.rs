//! Output containers filled by analysis tasks
//!
//! ```text
//!   TaskOutputs
//!   ├── slot 1: OutputList ── Histogram1D, Histogram1D, ...
//!   ├── slot 2: Tree
//!   └── slot n: Tree
//! ```
//!
//! Every container owns what it holds; dropping the task drops its outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::CepError;
use crate::CepResult;

// ═══════════════════════════════════════════════════════════════════════════════
// HISTOGRAM
// ═══════════════════════════════════════════════════════════════════════════════

/// One-dimensional histogram with uniform bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram1D {
    pub name: String,
    pub title: String,
    pub min: f64,
    pub max: f64,
    /// Bin counts
    pub counts: Vec<u64>,
    /// Total entries, including under- and overflow
    pub entries: u64,
    pub underflow: u64,
    pub overflow: u64,
    sum: f64,
    sum_sq: f64,
}

impl Histogram1D {
    pub fn new(name: &str, title: &str, n_bins: usize, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            min,
            max,
            counts: vec![0; n_bins],
            entries: 0,
            underflow: 0,
            overflow: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.n_bins() as f64
    }

    /// Bin index holding `value`, or None when outside [min, max)
    ///
    /// A histogram without bins has no range: every value is under- or overflow.
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        let last = self.n_bins().checked_sub(1)?;
        if value.is_nan() || value < self.min || value >= self.max {
            return None;
        }
        let bin = ((value - self.min) / self.bin_width()) as usize;
        Some(bin.min(last))
    }

    pub fn fill(&mut self, value: f64) {
        self.entries += 1;
        match self.find_bin(value) {
            Some(bin) => {
                self.counts[bin] += 1;
                self.sum += value;
                self.sum_sq += value * value;
            }
            None if value < self.min => self.underflow += 1,
            None => self.overflow += 1,
        }
    }

    /// Count in the bin holding `value`
    pub fn count_at(&self, value: f64) -> u64 {
        self.find_bin(value).map_or(0, |bin| self.counts[bin])
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 + 0.5) * self.bin_width()
    }

    /// Entries inside the axis range
    pub fn in_range(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Mean of the in-range entries
    pub fn mean(&self) -> f64 {
        match self.in_range() {
            0 => 0.0,
            n => self.sum / n as f64,
        }
    }

    pub fn std(&self) -> f64 {
        let n = self.in_range();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / n as f64 - mean * mean).max(0.0).sqrt()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE
// ═══════════════════════════════════════════════════════════════════════════════

/// Flat table of numeric rows with named branches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub name: String,
    pub title: String,
    pub branches: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Tree {
    pub fn new(name: &str, title: &str, branches: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            branches: branches.iter().map(|b| b.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append one row; it must carry one value per branch
    pub fn fill(&mut self, row: &[f64]) -> CepResult<()> {
        if row.len() != self.branches.len() {
            return Err(CepError::RowWidthMismatch {
                tree: self.name.clone(),
                expected: self.branches.len(),
                got: row.len(),
            });
        }
        self.rows.push(row.to_vec());
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.rows.len()
    }

    /// All values of one branch
    pub fn column(&self, branch: &str) -> Option<Vec<f64>> {
        let idx = self.branches.iter().position(|b| b == branch)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTAINERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Owning list of histograms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputList {
    pub histograms: Vec<Histogram1D>,
}

impl OutputList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, histogram: Histogram1D) {
        self.histograms.push(histogram);
    }

    pub fn get(&self, name: &str) -> Option<&Histogram1D> {
        self.histograms.iter().find(|h| h.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Histogram1D> {
        self.histograms.iter_mut().find(|h| h.name == name)
    }

    /// Fill a histogram by name; unknown names are ignored
    pub fn fill(&mut self, name: &str, value: f64) {
        if let Some(h) = self.get_mut(name) {
            h.fill(value);
        }
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }
}

/// Content of one output slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputObject {
    List(OutputList),
    Tree(Tree),
}

/// Numbered output slots of one task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOutputs {
    slots: BTreeMap<usize, OutputObject>,
}

impl TaskOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an object to a slot, replacing what was there
    pub fn define(&mut self, slot: usize, object: OutputObject) {
        self.slots.insert(slot, object);
    }

    pub fn get(&self, slot: usize) -> Option<&OutputObject> {
        self.slots.get(&slot)
    }

    pub fn list(&self, slot: usize) -> CepResult<&OutputList> {
        match self.slots.get(&slot) {
            Some(OutputObject::List(list)) => Ok(list),
            _ => Err(CepError::UnknownSlot(slot)),
        }
    }

    pub fn list_mut(&mut self, slot: usize) -> CepResult<&mut OutputList> {
        match self.slots.get_mut(&slot) {
            Some(OutputObject::List(list)) => Ok(list),
            _ => Err(CepError::UnknownSlot(slot)),
        }
    }

    pub fn tree(&self, slot: usize) -> CepResult<&Tree> {
        match self.slots.get(&slot) {
            Some(OutputObject::Tree(tree)) => Ok(tree),
            _ => Err(CepError::UnknownSlot(slot)),
        }
    }

    pub fn tree_mut(&mut self, slot: usize) -> CepResult<&mut Tree> {
        match self.slots.get_mut(&slot) {
            Some(OutputObject::Tree(tree)) => Ok(tree),
            _ => Err(CepError::UnknownSlot(slot)),
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = (usize, &OutputObject)> {
        self.slots.iter().map(|(&slot, obj)| (slot, obj))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Write the outputs of several tasks, keyed by task name, as pretty JSON
pub fn write_outputs<'a, I>(path: impl AsRef<Path>, outputs: I) -> CepResult<()>
where
    I: IntoIterator<Item = (&'a str, &'a TaskOutputs)>,
{
    let doc: BTreeMap<&str, &TaskOutputs> = outputs.into_iter().collect();
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(path.as_ref(), json)
        .map_err(|e| CepError::Io(format!("Failed to write outputs: {}", e)))?;
    log::info!("Wrote {} task output(s) to {:?}", doc.len(), path.as_ref());
    Ok(())
}

/// Read back a file produced by [`write_outputs`]
pub fn read_outputs(path: impl AsRef<Path>) -> CepResult<BTreeMap<String, TaskOutputs>> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| CepError::Io(format!("Failed to read outputs: {}", e)))?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_histogram_binning() {
        let mut h = Histogram1D::new("pt", "pt", 100, 0.0, 10.0);
        h.fill(0.05);
        h.fill(9.99);
        h.fill(10.0);
        h.fill(-0.1);
        h.fill(f64::NAN);

        assert_eq!(h.counts[0], 1);
        assert_eq!(h.counts[99], 1);
        assert_eq!(h.overflow, 2);
        assert_eq!(h.underflow, 1);
        assert_eq!(h.entries, 5);
        assert_eq!(h.in_range(), 2);
    }

    #[test]
    fn test_histogram_without_bins() {
        let mut h = Histogram1D::new("empty", "no bins", 0, 0.0, 1.0);
        h.fill(0.5);
        h.fill(-1.0);
        assert_eq!(h.find_bin(0.5), None);
        assert_eq!(h.count_at(0.5), 0);
        assert_eq!(h.in_range(), 0);
        assert_eq!(h.underflow, 1);
        assert_eq!(h.overflow, 1);
        assert_eq!(h.entries, 2);
    }

    #[test]
    fn test_histogram_statistics() {
        let mut h = Histogram1D::new("x", "x", 10, -5.0, 5.0);
        for v in [-1.0, 1.0, -1.0, 1.0] {
            h.fill(v);
        }
        assert!(h.mean().abs() < 1e-12);
        assert!((h.std() - 1.0).abs() < 1e-12);
        assert!((h.bin_center(5) - 0.5).abs() < 1e-12);
        assert_eq!(h.count_at(1.0), 2);
    }

    #[test]
    fn test_tree_rejects_wrong_width() {
        let mut tree = Tree::new("t", "test", &["a", "b"]);
        tree.fill(&[1.0, 2.0]).unwrap();
        let err = tree.fill(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            CepError::RowWidthMismatch {
                expected: 2,
                got: 1,
                ..
            }
        ));
        assert_eq!(tree.entries(), 1);
        assert_eq!(tree.column("b"), Some(vec![2.0]));
        assert_eq!(tree.column("c"), None);
    }

    #[test]
    fn test_slots_are_typed() {
        let mut outputs = TaskOutputs::new();
        outputs.define(1, OutputObject::List(OutputList::new()));
        outputs.define(2, OutputObject::Tree(Tree::new("t", "t", &["a"])));

        assert!(outputs.list(1).is_ok());
        assert!(outputs.tree(2).is_ok());
        assert!(matches!(outputs.tree(1), Err(CepError::UnknownSlot(1))));
        assert!(matches!(outputs.list_mut(3), Err(CepError::UnknownSlot(3))));
    }

    #[test]
    fn test_write_and_read_outputs() {
        let mut outputs = TaskOutputs::new();
        let mut list = OutputList::new();
        list.add(Histogram1D::new("h", "h", 4, 0.0, 4.0));
        list.fill("h", 2.5);
        list.fill("missing", 1.0);
        outputs.define(1, OutputObject::List(list));

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.json");
        write_outputs(&path, [("task", &outputs)]).unwrap();

        let back = read_outputs(&path).unwrap();
        let hist = back["task"].list(1).unwrap().get("h").unwrap();
        assert_eq!(hist.counts, vec![0, 0, 1, 0]);
    }
}
