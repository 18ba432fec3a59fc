//! Append-only audit history shared by every workflow kind
//!
//! Every record carries the sha256 of its CBOR encoding chained onto the hash of the
//! record before it. The current status of an instance is always read off the newest
//! record.
use super::error::WorkflowError;
use super::role::Role;
use chrono::{DateTime, TimeZone, Utc};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

/// Anything usable as a workflow status
pub trait Status: Copy + Eq + fmt::Debug + fmt::Display + minicbor::Encode<()> {}

impl<T> Status for T where T: Copy + Eq + fmt::Debug + fmt::Display + minicbor::Encode<()> {}

#[derive(minicbor::Encode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    #[n(0)]
    Created,
    #[n(1)]
    Transition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord<S> {
    pub timestamp: TimeStamp<Utc>,
    pub role: Role,
    pub kind: RecordKind,
    pub status: S, // resulting status after this record
    pub comment: String,
    pub prev_hash: Option<String>,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History<S> {
    records: Vec<HistoryRecord<S>>,
    head: S,
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Created => f.write_str("Created"),
            RecordKind::Transition => f.write_str("Transition"),
        }
    }
}

fn digest<S: Status>(
    prev_hash: Option<&str>,
    timestamp: &TimeStamp<Utc>,
    role: Role,
    kind: RecordKind,
    status: &S,
    comment: &str,
) -> Result<String, WorkflowError> {
    let cbor = minicbor::to_vec((prev_hash, timestamp, role, kind, status, comment))
        .map_err(|e| WorkflowError::Encoding(e.to_string()))?;

    Ok(sha256::digest(&cbor))
}

impl<S: Status> HistoryRecord<S> {
    fn build(
        prev_hash: Option<String>,
        timestamp: TimeStamp<Utc>,
        role: Role,
        kind: RecordKind,
        status: S,
        comment: &str,
    ) -> Result<Self, WorkflowError> {
        let hash = digest(
            prev_hash.as_deref(),
            &timestamp,
            role,
            kind,
            &status,
            comment,
        )?;

        Ok(Self {
            timestamp,
            role,
            kind,
            status,
            comment: comment.to_string(),
            prev_hash,
            hash,
        })
    }

    /// Recompute the hash from the record's contents
    pub fn verify(&self) -> bool {
        digest(
            self.prev_hash.as_deref(),
            &self.timestamp,
            self.role,
            self.kind,
            &self.status,
            &self.comment,
        )
        .is_ok_and(|hash| hash == self.hash)
    }
}

/// Ordering predicate: true when any record in `records` was authored by `role`.
///
/// This is a membership test over authors. It says nothing about where in the log the
/// record sits or what has happened since.
pub fn has_prior_record_by<S>(records: &[HistoryRecord<S>], role: Role) -> bool {
    records.iter().any(|record| record.role == role)
}

impl<S: Status> History<S> {
    /// Start a history with its `Created` record
    pub fn open(role: Role, initial: S) -> Result<Self, WorkflowError> {
        let created = HistoryRecord::build(
            None,
            TimeStamp::new(),
            role,
            RecordKind::Created,
            initial,
            "Initial submission",
        )?;

        Ok(Self {
            records: vec![created],
            head: initial,
        })
    }

    pub fn current(&self) -> S {
        self.head
    }

    pub fn records(&self) -> &[HistoryRecord<S>] {
        &self.records
    }

    pub fn latest(&self) -> Option<&HistoryRecord<S>> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn authored_by(&self, role: Role) -> bool {
        has_prior_record_by(&self.records, role)
    }

    /// Hash of the newest record, a digest of the whole log
    pub fn head_hash(&self) -> Option<&str> {
        self.latest().map(|record| record.hash.as_str())
    }

    /// Build the next record without touching the log.
    ///
    /// Callers prepare every record an operation needs and commit only once all of them
    /// built.
    pub(crate) fn prepare(
        &self,
        role: Role,
        status: S,
        comment: &str,
    ) -> Result<HistoryRecord<S>, WorkflowError> {
        let prev = self.latest();
        // clock steps backwards must not reorder the log
        let timestamp = match prev {
            Some(prev) if prev.timestamp > TimeStamp::new() => prev.timestamp.clone(),
            _ => TimeStamp::new(),
        };

        HistoryRecord::build(
            prev.map(|record| record.hash.clone()),
            timestamp,
            role,
            RecordKind::Transition,
            status,
            comment,
        )
    }

    pub(crate) fn commit(&mut self, record: HistoryRecord<S>) {
        debug_assert_eq!(record.prev_hash.as_deref(), self.head_hash());
        self.head = record.status;
        self.records.push(record);
    }

    pub(crate) fn append(
        &mut self,
        role: Role,
        status: S,
        comment: &str,
    ) -> Result<(), WorkflowError> {
        let record = self.prepare(role, status, comment)?;
        self.commit(record);
        Ok(())
    }

    /// Walk the chain checking every hash and every back link
    pub fn verify(&self) -> bool {
        let mut prev: Option<&str> = None;

        for record in &self.records {
            if record.prev_hash.as_deref() != prev || !record.verify() {
                return false;
            }
            prev = Some(record.hash.as_str());
        }

        self.records
            .last()
            .is_some_and(|record| record.status == self.head)
    }
}
