//! Persistent store for runs, steps and candidates.
//!
//! Records are kept as JSON in [sled] trees keyed by their UUID. Two index trees link records to
//! their parents:
//!
//! * `run_steps`: run ID + step ID
//! * `candidates`: step ID + insertion sequence number, so a step's candidates are a contiguous
//!   key range in creation order
//!
//! A third tree, `selected_candidates`, repeats the keys of selected candidates. Candidates are
//! never updated, so counting either tree by step prefix gives the candidate counts used by the
//! filtering statistics.

use crate::analytics::{CandidateCounter, StepFinder};
use crate::error::XRayError;
use crate::models::{
    Candidate, CompleteStepRequest, CreateCandidateRequest, CreateRunRequest, CreateStepRequest,
    FilteringStatsQuery, Run, RunQuery, RunResponse, RunStatus, Step, StepResponse, StepStatus,
};

use chrono::{NaiveDateTime, Utc};
use hashbrown::HashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sled::transaction::ConflictableTransactionError;
use sled::{Transactional, Tree};
use std::path::Path;
use uuid::Uuid;

/// Store of X-Ray records.
///
/// Cloning is cheap and clones share the underlying database.
#[derive(Clone, Debug)]
pub struct Store {
    db: sled::Db,
    runs: Tree,
    steps: Tree,
    run_steps: Tree,
    candidates: Tree,
    selected_candidates: Tree,
}

impl Store {
    /// Open (or create) a store in a directory.
    ///
    /// # Arguments
    ///
    /// * `path`: Directory of the sled database
    pub fn open(path: &Path) -> Result<Self, XRayError> {
        Self::from_db(sled::Config::new().path(path).open()?)
    }

    /// Open a store that is deleted when dropped.
    pub fn temporary() -> Result<Self, XRayError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, XRayError> {
        Ok(Self {
            runs: db.open_tree("runs")?,
            steps: db.open_tree("steps")?,
            run_steps: db.open_tree("run_steps")?,
            candidates: db.open_tree("candidates")?,
            selected_candidates: db.open_tree("selected_candidates")?,
            db,
        })
    }

    /// Flush pending writes to disk.
    pub async fn flush(&self) -> Result<(), XRayError> {
        self.db.flush_async().await?;
        Ok(())
    }

    /// Start a run.
    ///
    /// Returns the ID of the new run.
    #[tracing::instrument(level = "DEBUG", skip(self, request))]
    pub fn create_run(&self, request: CreateRunRequest) -> Result<Uuid, XRayError> {
        let run = Run {
            run_id: Uuid::new_v4(),
            pipeline_type: request.pipeline_type,
            pipeline_id: request.pipeline_id,
            started_at: now(),
            completed_at: None,
            status: RunStatus::InProgress,
            input: request.input,
            output: None,
        };
        self.put_run(&run)?;
        tracing::debug!(run_id = %run.run_id, "created run");
        Ok(run.run_id)
    }

    /// Write a run record.
    pub(crate) fn put_run(&self, run: &Run) -> Result<(), XRayError> {
        self.runs.insert(run.run_id.as_bytes(), encode(run)?)?;
        Ok(())
    }

    /// Return a run.
    pub fn get_run(&self, run_id: Uuid) -> Result<Run, XRayError> {
        get(&self.runs, run_id)?.ok_or(XRayError::RunNotFound { run_id })
    }

    /// Return a run with its steps and their candidates.
    pub fn run_details(&self, run_id: Uuid) -> Result<RunResponse, XRayError> {
        let run = self.get_run(run_id)?;
        let steps = self
            .steps_by_run(run_id)?
            .into_iter()
            .map(|step| {
                let candidates = self.candidates_by_step(step.step_id, None)?;
                Ok(StepResponse { step, candidates })
            })
            .collect::<Result<Vec<_>, XRayError>>()?;
        Ok(RunResponse { run, steps })
    }

    /// Return the runs matching a query, ordered by start time.
    pub fn list_runs(&self, query: &RunQuery) -> Result<Vec<Run>, XRayError> {
        let mut runs = Vec::new();
        for value in self.runs.iter().values() {
            let run: Run = decode(&value?)?;
            if query.matches(&run) {
                runs.push(run);
            }
        }
        runs.sort_by_key(|run| run.started_at);
        Ok(runs)
    }

    /// Mark a run as completed.
    pub fn complete_run(&self, run_id: Uuid, output: Option<Value>) -> Result<(), XRayError> {
        let mut run = self.get_run(run_id)?;
        run.status = RunStatus::Completed;
        run.completed_at = Some(now());
        run.output = output;
        self.put_run(&run)
    }

    /// Mark a run as failed.
    pub fn fail_run(&self, run_id: Uuid) -> Result<(), XRayError> {
        let mut run = self.get_run(run_id)?;
        run.status = RunStatus::Failed;
        run.completed_at = Some(now());
        self.put_run(&run)
    }

    /// Record a step of a run, together with any candidates in the request.
    ///
    /// Returns the ID of the new step.
    #[tracing::instrument(level = "DEBUG", skip(self, request))]
    pub fn create_step(&self, run_id: Uuid, request: CreateStepRequest) -> Result<Uuid, XRayError> {
        self.get_run(run_id)?;
        let step = Step {
            step_id: Uuid::new_v4(),
            run_id,
            step_name: request.step_name,
            step_type: request.step_type,
            order: request.order,
            started_at: now(),
            completed_at: None,
            status: StepStatus::Success,
            input: request.input,
            output: request.output.map(Value::Object),
            reasoning: request.reasoning,
            metadata: request.metadata,
        };
        self.put_step(&step)?;
        if let Some(candidates) = request.candidates {
            if !candidates.is_empty() {
                self.insert_candidates(step.step_id, candidates)?;
            }
        }
        tracing::debug!(step_id = %step.step_id, "created step");
        Ok(step.step_id)
    }

    /// Write a step record and link it to its run.
    pub(crate) fn put_step(&self, step: &Step) -> Result<(), XRayError> {
        let step_key = step.step_id.as_bytes().to_vec();
        let index_key = child_key(step.run_id, step.step_id.as_bytes());
        let value = encode(step)?;
        (&self.steps, &self.run_steps).transaction(|(steps, run_steps)| {
            steps.insert(&step_key[..], &value[..])?;
            run_steps.insert(&index_key[..], &b""[..])?;
            Ok::<(), ConflictableTransactionError<()>>(())
        })?;
        Ok(())
    }

    /// Return a step.
    pub fn get_step(&self, step_id: Uuid) -> Result<Step, XRayError> {
        get(&self.steps, step_id)?.ok_or(XRayError::StepNotFound { step_id })
    }

    /// Return the steps of a run, ordered by position.
    pub fn steps_by_run(&self, run_id: Uuid) -> Result<Vec<Step>, XRayError> {
        let mut steps = Vec::new();
        for key in self.run_steps.scan_prefix(run_id.as_bytes()).keys() {
            let key = key?;
            let step_id = Uuid::from_slice(&key[16..]).map_err(|_| {
                XRayError::Storage(sled::Error::ReportableBug(
                    "malformed run_steps index key".to_string(),
                ))
            })?;
            steps.push(self.get_step(step_id)?);
        }
        steps.sort_by_key(|step| (step.order, step.started_at));
        Ok(steps)
    }

    /// Return the steps of a type, ordered by start time.
    pub fn steps_by_type(&self, step_type: &str) -> Result<Vec<Step>, XRayError> {
        self.scan_steps(|step| Ok(step.step_type == step_type))
    }

    /// Return the steps satisfying a predicate, ordered by start time.
    fn scan_steps<P>(&self, mut predicate: P) -> Result<Vec<Step>, XRayError>
    where
        P: FnMut(&Step) -> Result<bool, XRayError>,
    {
        let mut steps = Vec::new();
        for value in self.steps.iter().values() {
            let step: Step = decode(&value?)?;
            if predicate(&step)? {
                steps.push(step);
            }
        }
        steps.sort_by_key(|step| step.started_at);
        Ok(steps)
    }

    /// Mark a step as completed.
    ///
    /// An absent reasoning keeps the existing one.
    pub fn complete_step(
        &self,
        step_id: Uuid,
        request: CompleteStepRequest,
    ) -> Result<(), XRayError> {
        let mut step = self.get_step(step_id)?;
        step.completed_at = Some(now());
        step.output = request.output;
        if let Some(reasoning) = request.reasoning {
            step.reasoning = Some(reasoning);
        }
        self.put_step(&step)
    }

    /// Record a candidate of a step.
    ///
    /// Returns the ID of the new candidate.
    pub fn create_candidate(
        &self,
        step_id: Uuid,
        request: CreateCandidateRequest,
    ) -> Result<Uuid, XRayError> {
        self.get_step(step_id)?;
        let mut ids = self.insert_candidates(step_id, vec![request])?;
        Ok(ids.remove(0))
    }

    /// Record several candidates of a step at once.
    ///
    /// Either all candidates are stored or none are. Returns the IDs of the new candidates in
    /// request order.
    pub fn create_candidates(
        &self,
        step_id: Uuid,
        requests: Vec<CreateCandidateRequest>,
    ) -> Result<Vec<Uuid>, XRayError> {
        self.get_step(step_id)?;
        self.insert_candidates(step_id, requests)
    }

    #[tracing::instrument(level = "DEBUG", skip(self, requests), fields(count = requests.len()))]
    fn insert_candidates(
        &self,
        step_id: Uuid,
        requests: Vec<CreateCandidateRequest>,
    ) -> Result<Vec<Uuid>, XRayError> {
        let mut ids = Vec::with_capacity(requests.len());
        let mut records = Vec::with_capacity(requests.len());
        for request in requests {
            let candidate = Candidate {
                candidate_id: Uuid::new_v4(),
                step_id,
                data: request.data,
                score: request.score,
                selected: request.selected.unwrap_or(false),
                rejection_reason: request.rejection_reason,
                metadata: request.metadata,
            };
            let sequence = self.db.generate_id()?;
            let key = child_key(step_id, &sequence.to_be_bytes());
            records.push((key, encode(&candidate)?, candidate.selected));
            ids.push(candidate.candidate_id);
        }
        (&self.candidates, &self.selected_candidates).transaction(|(candidates, selected)| {
            for (key, value, is_selected) in &records {
                candidates.insert(&key[..], &value[..])?;
                if *is_selected {
                    selected.insert(&key[..], &b""[..])?;
                }
            }
            Ok::<(), ConflictableTransactionError<()>>(())
        })?;
        Ok(ids)
    }

    /// Return the candidates of a step in creation order, optionally only those with the given
    /// selection flag.
    pub fn candidates_by_step(
        &self,
        step_id: Uuid,
        selected: Option<bool>,
    ) -> Result<Vec<Candidate>, XRayError> {
        let mut candidates = Vec::new();
        for value in self.candidates.scan_prefix(step_id.as_bytes()).values() {
            let candidate: Candidate = decode(&value?)?;
            if selected.map_or(true, |selected| selected == candidate.selected) {
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }
}

impl StepFinder for Store {
    #[tracing::instrument(level = "DEBUG", skip(self))]
    fn find_filter_steps(&self, query: &FilteringStatsQuery) -> Result<Vec<Step>, XRayError> {
        // Pipeline type of each run seen so far.
        let mut pipeline_types: HashMap<Uuid, String> = HashMap::new();
        self.scan_steps(|step| {
            if !step.is_filter() {
                return Ok(false);
            }
            if query.pipeline_type.is_none() {
                return Ok(query.matches(step, ""));
            }
            if !pipeline_types.contains_key(&step.run_id) {
                let run = self.get_run(step.run_id)?;
                pipeline_types.insert(step.run_id, run.pipeline_type);
            }
            Ok(query.matches(step, &pipeline_types[&step.run_id]))
        })
    }
}

impl CandidateCounter for Store {
    fn count_candidates(&self, step_id: Uuid) -> Result<u64, XRayError> {
        count_prefix(&self.candidates, step_id.as_bytes())
    }

    fn count_selected_candidates(&self, step_id: Uuid) -> Result<u64, XRayError> {
        count_prefix(&self.selected_candidates, step_id.as_bytes())
    }
}

/// Current time as a naive UTC timestamp
fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Key of a child record: parent UUID followed by the child's key bytes
fn child_key(parent: Uuid, child: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + child.len());
    key.extend_from_slice(parent.as_bytes());
    key.extend_from_slice(child);
    key
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, XRayError> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, XRayError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read and decode a record by ID.
fn get<T: DeserializeOwned>(tree: &Tree, id: Uuid) -> Result<Option<T>, XRayError> {
    tree.get(id.as_bytes())?
        .map(|value| decode(&value))
        .transpose()
}

/// Count the keys of a tree starting with a prefix.
fn count_prefix(tree: &Tree, prefix: &[u8]) -> Result<u64, XRayError> {
    let mut count: usize = 0;
    for key in tree.scan_prefix(prefix).keys() {
        key?;
        count += 1;
    }
    Ok(u64::try_from(count)?)
}
