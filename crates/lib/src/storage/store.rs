//! Indexed allocation store.
//!
//! Records are kept in arrival order and addressed by a monotonically
//! increasing sequence number, so evicting the oldest record never shifts
//! the positions held by the function, file and time indices.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use super::types::{
  AllocationDocument, FunctionTotals, QueryResult, StorageError, StorageSummary, TimelinePoint,
};
use crate::capture::AllocationInfo;
use crate::consts::{ALLOCATIONS_FILENAME, DEFAULT_DATA_DIR, DEFAULT_MAX_ALLOCATIONS};

type Seq = u64;

#[derive(Debug)]
struct StorageState {
  data_dir: PathBuf,
  records: VecDeque<AllocationInfo>,
  /// Sequence number of `records[0]`.
  first_seq: Seq,
  function_index: HashMap<String, VecDeque<Seq>>,
  file_index: HashMap<String, VecDeque<Seq>>,
  time_index: BTreeSet<(u64, Seq)>,
  max_allocations: usize,
}

impl StorageState {
  fn new(data_dir: PathBuf) -> Self {
    Self {
      data_dir,
      records: VecDeque::new(),
      first_seq: 0,
      function_index: HashMap::new(),
      file_index: HashMap::new(),
      time_index: BTreeSet::new(),
      max_allocations: DEFAULT_MAX_ALLOCATIONS,
    }
  }

  fn get(&self, seq: Seq) -> Option<&AllocationInfo> {
    let offset = seq.checked_sub(self.first_seq)?;
    self.records.get(offset as usize)
  }

  fn next_seq(&self) -> Seq {
    self.first_seq + self.records.len() as Seq
  }

  fn insert(&mut self, info: AllocationInfo) {
    while self.records.len() >= self.max_allocations {
      self.evict_oldest();
    }

    let seq = self.next_seq();
    self.function_index.entry(info.function.clone()).or_default().push_back(seq);
    self.file_index.entry(info.file.clone()).or_default().push_back(seq);
    self.time_index.insert((info.timestamp, seq));
    self.records.push_back(info);
  }

  fn evict_oldest(&mut self) {
    let Some(oldest) = self.records.pop_front() else {
      return;
    };
    let seq = self.first_seq;
    self.first_seq += 1;

    unindex(&mut self.function_index, &oldest.function, seq);
    unindex(&mut self.file_index, &oldest.file, seq);
    self.time_index.remove(&(oldest.timestamp, seq));
  }

  fn query_index(&self, index: &HashMap<String, VecDeque<Seq>>, key: &str) -> QueryResult {
    let mut result = QueryResult::default();
    if let Some(seqs) = index.get(key) {
      for info in seqs.iter().filter_map(|&seq| self.get(seq)) {
        if info.is_live() {
          result.push(info, true);
        }
      }
    }
    result.finish()
  }

  fn clear(&mut self) {
    self.first_seq = self.next_seq();
    self.records.clear();
    self.function_index.clear();
    self.file_index.clear();
    self.time_index.clear();
  }
}

/// Index entries per key are in ascending sequence order, so the evicted
/// (globally oldest) record is always at the front.
fn unindex(index: &mut HashMap<String, VecDeque<Seq>>, key: &str, seq: Seq) {
  if let Some(seqs) = index.get_mut(key) {
    if seqs.front() == Some(&seq) {
      seqs.pop_front();
    } else {
      seqs.retain(|&s| s != seq);
    }
    if seqs.is_empty() {
      index.remove(key);
    }
  }
}

/// Thread-safe allocation store with JSON persistence.
#[derive(Debug)]
pub struct Storage {
  state: Mutex<StorageState>,
}

impl Storage {
  /// Create an empty store rooted at the default `./data` directory.
  pub fn new() -> Self {
    Self::with_data_dir(PathBuf::from(DEFAULT_DATA_DIR))
  }

  /// Create an empty store rooted at `data_dir`. Nothing is created on disk
  /// until [`Storage::initialize`] runs.
  pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
    Self {
      state: Mutex::new(StorageState::new(data_dir.into())),
    }
  }

  fn lock(&self) -> MutexGuard<'_, StorageState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Point the store at `data_dir` and make sure the directory exists.
  pub fn initialize(&self, data_dir: impl AsRef<Path>) -> Result<(), StorageError> {
    let data_dir = data_dir.as_ref().to_path_buf();
    fs::create_dir_all(&data_dir).map_err(|source| StorageError::CreateDir {
      path: data_dir.clone(),
      source,
    })?;
    info!(data_dir = ?data_dir, "storage initialized");
    self.lock().data_dir = data_dir;
    Ok(())
  }

  pub fn data_dir(&self) -> PathBuf {
    self.lock().data_dir.clone()
  }

  /// Save everything to `<data_dir>/allocations.json`, then clear.
  pub fn shutdown(&self) -> Result<PathBuf, StorageError> {
    let path = self.data_dir().join(ALLOCATIONS_FILENAME);
    self.export_json(&path)?;
    self.clear();
    info!("storage shutdown");
    Ok(path)
  }

  pub fn add_allocation(&self, info: AllocationInfo) {
    self.lock().insert(info);
  }

  pub fn add_allocations<I>(&self, allocations: I)
  where
    I: IntoIterator<Item = AllocationInfo>,
  {
    let mut state = self.lock();
    for info in allocations {
      state.insert(info);
    }
  }

  pub fn len(&self) -> usize {
    self.lock().records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Live records allocated from `function_name`.
  pub fn query_by_function(&self, function_name: &str) -> QueryResult {
    let state = self.lock();
    state.query_index(&state.function_index, function_name)
  }

  /// Live records allocated from `file_path`.
  pub fn query_by_file(&self, file_path: &str) -> QueryResult {
    let state = self.lock();
    state.query_index(&state.file_index, file_path)
  }

  /// Live records whose size lies in `[min_size, max_size]`.
  pub fn query_by_size_range(&self, min_size: u64, max_size: u64) -> QueryResult {
    let state = self.lock();
    let mut result = QueryResult::default();
    for info in state
      .records
      .iter()
      .filter(|i| i.is_live() && (min_size..=max_size).contains(&i.size))
    {
      result.push(info, true);
    }
    result.finish()
  }

  /// Every record with a timestamp in `[start_time, end_time]`, ordered by
  /// timestamp. Freed records are included but only live ones add to
  /// `total_size`.
  pub fn query_by_time_range(&self, start_time: u64, end_time: u64) -> QueryResult {
    let state = self.lock();
    let mut result = QueryResult::default();
    if start_time > end_time {
      return result;
    }
    for &(_, seq) in state.time_index.range((start_time, Seq::MIN)..=(end_time, Seq::MAX)) {
      if let Some(info) = state.get(seq) {
        result.push(info, info.is_live());
      }
    }
    result.finish()
  }

  /// Every record whose deallocation was never observed.
  pub fn leaks(&self) -> Vec<AllocationInfo> {
    self.lock().records.iter().filter(|i| i.is_live()).cloned().collect()
  }

  pub fn summary(&self) -> StorageSummary {
    let state = self.lock();
    let by_function = state
      .function_index
      .iter()
      .map(|(name, seqs)| {
        let totals = seqs
          .iter()
          .filter_map(|&seq| state.get(seq))
          .fold(FunctionTotals::default(), |acc, info| FunctionTotals {
            count: acc.count + 1,
            total_size: acc.total_size.saturating_add(info.size),
          });
        (name.clone(), totals)
      })
      .collect::<BTreeMap<_, _>>();

    StorageSummary {
      total_allocations: state.records.len(),
      unique_functions: state.function_index.len(),
      data_dir: state.data_dir.clone(),
      by_function,
    }
  }

  /// Write every record to `path` as pretty JSON.
  ///
  /// Uses atomic write (write to temp, then rename) to prevent corruption.
  pub fn export_json(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
    let path = path.as_ref();
    let document = AllocationDocument {
      allocations: self.lock().records.iter().cloned().collect(),
    };
    let content = serde_json::to_string_pretty(&document).map_err(StorageError::Serialize)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    let write_err = |source: io::Error| StorageError::Write {
      path: path.to_path_buf(),
      source,
    };
    fs::write(&temp_path, content).map_err(write_err)?;
    fs::rename(&temp_path, path).map_err(write_err)?;

    info!(count = document.allocations.len(), path = ?path, "exported allocations");
    Ok(())
  }

  /// Append the records stored in `path`. Returns how many were read.
  pub fn import_json(&self, path: impl AsRef<Path>) -> Result<usize, StorageError> {
    let path = path.as_ref();
    let document = read_document(path)?;
    let count = document.allocations.len();
    self.add_allocations(document.allocations);
    info!(count, path = ?path, "imported allocations");
    Ok(count)
  }

  /// Live bytes grouped into `bucket_ns`-wide buckets, aligned to the
  /// earliest record.
  pub fn timeline(&self, bucket_ns: u64) -> Result<Vec<TimelinePoint>, StorageError> {
    if bucket_ns == 0 {
      return Err(StorageError::InvalidBucketSize);
    }

    let state = self.lock();
    let Some(&(min_time, _)) = state.time_index.first() else {
      return Ok(Vec::new());
    };

    let mut buckets: BTreeMap<u64, u64> = BTreeMap::new();
    for info in state.records.iter().filter(|i| i.is_live()) {
      let bucket = ((info.timestamp - min_time) / bucket_ns) * bucket_ns + min_time;
      let total = buckets.entry(bucket).or_default();
      *total = total.saturating_add(info.size);
    }

    Ok(
      buckets
        .into_iter()
        .map(|(timestamp, memory_usage)| TimelinePoint { timestamp, memory_usage })
        .collect(),
    )
  }

  pub fn max_allocations(&self) -> usize {
    self.lock().max_allocations
  }

  /// Bound the number of stored records. Excess records are evicted
  /// oldest-first right away. The bound is at least one.
  pub fn set_max_allocations(&self, max_allocations: usize) {
    let mut state = self.lock();
    state.max_allocations = max_allocations.max(1);
    let mut evicted = 0usize;
    while state.records.len() > state.max_allocations {
      state.evict_oldest();
      evicted += 1;
    }
    if evicted > 0 {
      debug!(evicted, max = state.max_allocations, "evicted records after lowering bound");
    }
  }

  pub fn clear(&self) {
    self.lock().clear();
  }
}

impl Default for Storage {
  fn default() -> Self {
    Self::new()
  }
}

/// Read an exported document without touching any store.
///
/// Records written by older exporters mark freed allocations with a zero
/// address instead of `freed_at`; those are normalized to freed records.
pub fn read_document(path: &Path) -> Result<AllocationDocument, StorageError> {
  let content = fs::read_to_string(path).map_err(|source| StorageError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  let mut document: AllocationDocument = serde_json::from_str(&content).map_err(|source| StorageError::Parse {
    path: path.to_path_buf(),
    source,
  })?;

  for info in &mut document.allocations {
    if info.address == 0 && info.freed_at.is_none() {
      info.freed_at = Some(info.timestamp);
    }
  }

  Ok(document)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;
  use tracing_test::traced_test;

  fn record(function: &str, file: &str, size: u64, timestamp: u64) -> AllocationInfo {
    AllocationInfo {
      timestamp,
      address: 0x1000 + timestamp,
      size,
      function: function.to_string(),
      file: file.to_string(),
      line: 1,
      thread_id: 1,
      stack_trace: vec![function.to_string(), "main".to_string()],
      freed_at: None,
    }
  }

  fn freed(mut info: AllocationInfo) -> AllocationInfo {
    info.freed_at = Some(info.timestamp + 1);
    info
  }

  fn sample_store() -> Storage {
    let storage = Storage::new();
    storage.add_allocations(vec![
      record("parse", "src/parse.rs", 100, 10),
      record("parse", "src/parse.rs", 300, 20),
      freed(record("parse", "src/parse.rs", 50, 30)),
      record("render", "src/render.rs", 1000, 40),
    ]);
    storage
  }

  #[test]
  fn query_by_function_counts_live_records() {
    let storage = sample_store();
    let result = storage.query_by_function("parse");
    assert_eq!(result.total_count, 2);
    assert_eq!(result.total_size, 400);
    assert_eq!(result.peak_usage, 300);
  }

  #[test]
  fn query_unknown_key_is_empty() {
    let storage = sample_store();
    assert_eq!(storage.query_by_function("missing"), QueryResult::default());
    assert_eq!(storage.query_by_file("missing.rs"), QueryResult::default());
  }

  #[test]
  fn query_by_file_matches_exact_path() {
    let storage = sample_store();
    let result = storage.query_by_file("src/render.rs");
    assert_eq!(result.total_count, 1);
    assert_eq!(result.total_size, 1000);
  }

  #[test]
  fn size_range_is_inclusive_and_live_only() {
    let storage = sample_store();
    let result = storage.query_by_size_range(50, 300);
    assert_eq!(result.total_count, 2);
    assert_eq!(result.total_size, 400);
  }

  #[test]
  fn time_range_includes_freed_but_sizes_only_live() {
    let storage = sample_store();
    let result = storage.query_by_time_range(20, 30);
    assert_eq!(result.total_count, 2);
    assert_eq!(result.total_size, 300);
    assert_eq!(result.peak_usage, 300);
    assert_eq!(storage.query_by_time_range(50, 10).total_count, 0);
  }

  #[test]
  fn leaks_are_live_records() {
    let storage = sample_store();
    let leaks = storage.leaks();
    assert_eq!(leaks.len(), 3);
    assert!(leaks.iter().all(AllocationInfo::is_live));
  }

  #[test]
  fn summary_groups_by_function() {
    let storage = sample_store();
    let summary = storage.summary();
    assert_eq!(summary.total_allocations, 4);
    assert_eq!(summary.unique_functions, 2);
    assert_eq!(summary.by_function["parse"], FunctionTotals { count: 3, total_size: 450 });
    assert_eq!(summary.by_function["render"].total_size, 1000);
  }

  #[test]
  fn oversized_imported_records_saturate_totals() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("huge.json");
    let huge = u64::MAX / 2 + 1;
    let document = AllocationDocument {
      allocations: vec![record("f", "f.rs", huge, 10), record("f", "f.rs", huge, 20)],
    };
    fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();

    let storage = Storage::new();
    assert_eq!(storage.import_json(&path).unwrap(), 2);

    assert_eq!(storage.summary().by_function["f"].total_size, u64::MAX);
    assert_eq!(storage.query_by_function("f").total_size, u64::MAX);
    assert_eq!(storage.timeline(1_000).unwrap()[0].memory_usage, u64::MAX);
  }

  #[test]
  fn eviction_keeps_indices_consistent() {
    let storage = Storage::new();
    storage.set_max_allocations(2);
    storage.add_allocation(record("a", "a.rs", 1, 1));
    storage.add_allocation(record("b", "b.rs", 2, 2));
    storage.add_allocation(record("b", "b.rs", 3, 3));

    assert_eq!(storage.len(), 2);
    assert_eq!(storage.query_by_function("a").total_count, 0);
    assert_eq!(storage.query_by_function("b").total_size, 5);
    assert_eq!(storage.query_by_time_range(0, 10).total_count, 2);
    assert_eq!(storage.summary().unique_functions, 1);
  }

  #[test]
  fn lowering_the_bound_evicts_oldest() {
    let storage = sample_store();
    storage.set_max_allocations(1);
    assert_eq!(storage.len(), 1);
    assert_eq!(storage.leaks()[0].function, "render");

    storage.set_max_allocations(0);
    assert_eq!(storage.max_allocations(), 1);
  }

  #[test]
  fn timeline_buckets_live_bytes_from_earliest_record() {
    let storage = Storage::new();
    storage.add_allocations(vec![
      record("f", "f.rs", 10, 100),
      record("f", "f.rs", 20, 150),
      freed(record("f", "f.rs", 999, 180)),
      record("f", "f.rs", 40, 320),
    ]);

    let timeline = storage.timeline(100).unwrap();
    assert_eq!(
      timeline,
      vec![
        TimelinePoint { timestamp: 100, memory_usage: 30 },
        TimelinePoint { timestamp: 300, memory_usage: 40 },
      ]
    );
  }

  #[test]
  fn timeline_rejects_zero_bucket_and_handles_empty() {
    let storage = Storage::new();
    assert!(storage.timeline(100).unwrap().is_empty());
    assert!(matches!(storage.timeline(0), Err(StorageError::InvalidBucketSize)));
  }

  #[test]
  #[traced_test]
  fn export_then_import_preserves_records() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("report.json");
    let storage = sample_store();
    storage.export_json(&path).unwrap();
    assert!(logs_contain("exported allocations"));

    let restored = Storage::new();
    assert_eq!(restored.import_json(&path).unwrap(), 4);
    assert_eq!(restored.leaks(), storage.leaks());
    assert!(!path.with_extension("json.tmp").exists());
  }

  #[test]
  fn import_treats_zero_address_as_freed() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("legacy.json");
    fs::write(
      &path,
      r#"{"allocations": [
        {"timestamp": 5, "address": 0, "size": 8, "function": "malloc",
         "file": "unknown", "line": 0, "thread_id": 1, "stack_trace": []},
        {"timestamp": 6, "address": 64, "size": 16, "function": "malloc",
         "file": "unknown", "line": 0, "thread_id": 1, "stack_trace": []}
      ]}"#,
    )
    .unwrap();

    let storage = Storage::new();
    storage.import_json(&path).unwrap();
    assert_eq!(storage.len(), 2);
    assert_eq!(storage.leaks().len(), 1);
  }

  #[test]
  fn import_reports_missing_and_malformed_files() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::new();
    assert!(matches!(
      storage.import_json(temp.path().join("missing.json")),
      Err(StorageError::Read { .. })
    ));

    let bad = temp.path().join("bad.json");
    fs::write(&bad, "not json").unwrap();
    assert!(matches!(storage.import_json(&bad), Err(StorageError::Parse { .. })));
  }

  #[test]
  fn shutdown_saves_into_data_dir_and_clears() {
    let temp = TempDir::new().unwrap();
    let storage = sample_store();
    storage.initialize(temp.path().join("data")).unwrap();

    let saved = storage.shutdown().unwrap();
    assert_eq!(saved, temp.path().join("data").join(ALLOCATIONS_FILENAME));
    assert!(saved.exists());
    assert!(storage.is_empty());
    assert_eq!(read_document(&saved).unwrap().allocations.len(), 4);
  }
}
