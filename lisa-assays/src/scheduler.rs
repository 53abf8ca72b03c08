//! Run orchestration.
//!
//! A [LisaRun] walks through `Unconfigured -> AlignmentReady ->
//! AssaysRegistered -> Executing -> Merged`, one step at a time. Assays run
//! one after another in sorted order, each parallel over its datasets on a
//! worker pool sized once per run.
use std::collections::BTreeMap;
use std::sync::OnceLock;

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use lisa_core::models::LisaData;
use lisa_core::{FactorAlignment, ResultsTable, RunLog};

use crate::assays::{Assay, AssayHandle, AssayKind, AssayResult, SharedResources};
use crate::background::{
    BackgroundStrategy, GeneRows, match_query, provided_background, random_background,
};
use crate::config::LisaConfig;
use crate::errors::{AssayError, PipelineError, Result};
use crate::report::{FailedAssay, RunMetadata, format_results};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunState {
    Unconfigured,
    AlignmentReady,
    AssaysRegistered,
    Executing,
    Merged,
}

impl RunState {
    pub fn next(self) -> Option<RunState> {
        match self {
            RunState::Unconfigured => Some(RunState::AlignmentReady),
            RunState::AlignmentReady => Some(RunState::AssaysRegistered),
            RunState::AssaysRegistered => Some(RunState::Executing),
            RunState::Executing => Some(RunState::Merged),
            RunState::Merged => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkerBudget {
    pub workers: usize,
    pub advisory: Option<String>,
}

///
/// Size the worker pool of a run.
///
/// The pool never exceeds the number of datasets, nor the available
/// parallelism minus one, and has at least one worker. A request of `-1`
/// asks for every core but one. When the requested count does not divide
/// the number of datasets an advisory is returned, naming the largest
/// worker count within the budget that does divide them. It is not an error.
///
pub fn compute_worker_budget(requested: i64, num_datasets: usize, available_parallelism: usize) -> WorkerBudget {
    let max_workers = available_parallelism.saturating_sub(1).max(1);
    let requested_workers = if requested <= -1 {
        max_workers
    } else {
        requested as usize
    };

    let workers = requested_workers.min(max_workers).min(num_datasets).max(1);

    let advisory = (requested_workers > 0 && num_datasets % requested_workers != 0).then(|| {
        let divisor = (1..=workers)
            .rev()
            .find(|d| num_datasets % d == 0)
            .unwrap_or(1);
        format!(
            "{} workers requested for {} datasets selected, which does not divide them evenly. Use {} workers, or make the number of datasets a multiple of the number of workers.",
            requested_workers, num_datasets, divisor
        )
    });

    WorkerBudget { workers, advisory }
}

pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub struct LisaRun<'a> {
    config: &'a LisaConfig,
    data: &'a LisaData,
    kinds: Vec<AssayKind>,
    state: RunState,
    alignment: OnceLock<FactorAlignment>,
    budget: Option<WorkerBudget>,
    pool: Option<ThreadPool>,
    results: Vec<AssayResult>,
    failure: Option<FailedAssay>,
    available_parallelism: usize,
    show_progress: bool,
    log: RunLog,
}

impl<'a> LisaRun<'a> {
    ///
    /// Validate `config` and set up a run over `data`. Unknown assay names
    /// fail here, before anything executes.
    ///
    pub fn new(config: &'a LisaConfig, data: &'a LisaData) -> Result<Self> {
        config.validate()?;
        let kinds = AssayKind::parse_all(&config.lisa.assays)?;

        Ok(LisaRun {
            config,
            data,
            kinds,
            state: RunState::Unconfigured,
            alignment: OnceLock::new(),
            budget: None,
            pool: None,
            results: vec![],
            failure: None,
            available_parallelism: available_parallelism(),
            show_progress: false,
            log: RunLog::new(),
        })
    }

    /// Continue an existing log, e.g. one holding resource resolution messages.
    pub fn with_log(mut self, log: RunLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_available_parallelism(mut self, available_parallelism: usize) -> Self {
        self.available_parallelism = available_parallelism;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn kinds(&self) -> &[AssayKind] {
        &self.kinds
    }

    pub fn budget(&self) -> Option<&WorkerBudget> {
        self.budget.as_ref()
    }

    pub fn results(&self) -> &[AssayResult] {
        &self.results
    }

    pub fn failure(&self) -> Option<&FailedAssay> {
        self.failure.as_ref()
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    fn check_transition(&self, to: RunState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        Ok(())
    }

    fn advance(&mut self, to: RunState) -> Result<()> {
        self.check_transition(to)?;
        self.state = to;
        Ok(())
    }

    fn compute_alignment(&self) -> Result<&FactorAlignment> {
        if let Some(alignment) = self.alignment.get() {
            return Ok(alignment);
        }
        let factors = self.data.link_metadata(self.config.lisa.isd_method)?.factors();
        let alignment = FactorAlignment::align(&self.data.rp_map_locs, &self.data.genes, &factors);
        Ok(self.alignment.get_or_init(|| alignment))
    }

    /// `Unconfigured -> AlignmentReady`: align the factor datasets against the RP map.
    pub fn align(&mut self) -> Result<&FactorAlignment> {
        self.advance(RunState::AlignmentReady)?;
        let selected = self.compute_alignment()?.num_selected();
        self.log.append(&format!(
            "Aligned {} factor genes to the RP map",
            selected
        ));
        self.compute_alignment()
    }

    /// `AlignmentReady -> AssaysRegistered`: size the worker pool and check every assay's data is loaded.
    pub fn register(&mut self) -> Result<&WorkerBudget> {
        self.advance(RunState::AssaysRegistered)?;

        let budget = compute_worker_budget(
            self.config.lisa.cores,
            self.config.lisa.num_datasets_selected,
            self.available_parallelism,
        );
        debug!(
            "requested {} workers, {} available, {} datasets: using {}",
            self.config.lisa.cores, self.available_parallelism, self.config.lisa.num_datasets_selected, budget.workers
        );
        if let Some(advisory) = &budget.advisory {
            self.log.warn(advisory);
        }

        self.pool = Some(
            ThreadPoolBuilder::new()
                .num_threads(budget.workers)
                .build()
                .map_err(AssayError::from)?,
        );

        let binding = self.data.technology(self.config.lisa.isd_method)?;
        let without_peaks: Vec<String> = binding
            .metadata
            .ids()
            .into_iter()
            .filter(|id| {
                binding
                    .profiles
                    .position(id)
                    .is_none_or(|col| binding.profiles.indices[col].is_empty())
            })
            .collect();
        if !without_peaks.is_empty() {
            self.log.warn(&format!(
                "{} {} datasets have no peaks and are scored as empty: {}",
                without_peaks.len(),
                self.config.lisa.isd_method,
                without_peaks.join(", ")
            ));
        }

        for kind in &self.kinds {
            if let AssayKind::Accessibility(technology) = kind {
                self.data.technology(*technology)?;
            }
            self.log.append(&format!("Registered {} assay", kind));
        }

        self.log.append(&format!("Using {} workers", budget.workers));
        Ok(self.budget.insert(budget))
    }

    ///
    /// `AssaysRegistered -> Executing`: run every assay in order. An assay
    /// failure is recorded and stops the remaining assays; the results of
    /// the assays that completed are kept.
    ///
    pub fn execute(&mut self, query: &GeneRows, background: &GeneRows) -> Result<()> {
        self.advance(RunState::Executing)?;

        let (Some(alignment), Some(pool)) = (self.alignment.get(), self.pool.as_ref()) else {
            return Err(PipelineError::InvalidTransition {
                from: RunState::Unconfigured,
                to: RunState::Executing,
            });
        };

        let resources = SharedResources {
            data: self.data,
            alignment,
            pool,
            isd_method: self.config.lisa.isd_method,
            generate_rp_matrix: self.config.generate_rp_matrix(),
            show_progress: self.show_progress,
        };
        let config = self.config;

        for &kind in &self.kinds {
            let outcome = self.log.section(&format!("Running {} assay", kind), |log| {
                let assay = AssayHandle::build(kind, &resources, config)?;
                assay.run(&query.rows, &background.rows, log)
            });

            match outcome {
                Ok(result) => {
                    debug!("{} assay scored {} datasets", kind, result.p_values.len());
                    self.results.push(result)
                }
                Err(e) => {
                    self.log.warn(&format!("{} assay failed: {}", kind, e));
                    self.failure = Some(FailedAssay {
                        assay: kind.to_string(),
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    ///
    /// `Executing -> Merged`: build the results table from the completed
    /// assays. The run stays in `Executing` if the table can't be built.
    ///
    pub fn merge(&mut self) -> Result<ResultsTable> {
        self.check_transition(RunState::Merged)?;
        let metadata = self.data.link_metadata(self.config.lisa.isd_method)?;
        let alignment = self.compute_alignment()?;
        let table = format_results(metadata, alignment, &self.results)?;
        self.state = RunState::Merged;
        self.log.append(&format!("Merged {} assays into {} rows", self.results.len(), table.len()));
        Ok(table)
    }

    fn select_genes<S: AsRef<str>>(&mut self, query: &[S], background: &[S]) -> Result<(GeneRows, GeneRows)> {
        let config = self.config;
        let predict = &config.predict;
        let data = self.data;

        self.log.section("Matching genes", |log| -> Result<(GeneRows, GeneRows)> {
            let query = match_query(data, query, predict.min_query_genes, predict.max_query_genes, log)?;
            let background = match predict.background_strategy {
                BackgroundStrategy::Provided => {
                    if background.is_empty() {
                        return Err(PipelineError::InvalidBackground(
                            "the provided strategy needs a background gene list".to_string(),
                        ));
                    }
                    provided_background(data, &query, background, log)?
                }
                BackgroundStrategy::Random => {
                    if !background.is_empty() {
                        log.warn("A background list was given but the strategy is random; ignoring it");
                    }
                    random_background(data, &query, predict.num_background_genes, predict.seed)
                }
            };
            log.append(&format!("Using {} background genes", background.len()));
            Ok((query, background))
        })
    }

    ///
    /// Run every step for one query and return the results table with the
    /// run's metadata.
    ///
    /// # Arguments
    /// - query: gene names of interest, symbols or aliases
    /// - background: background gene names, used by the `provided` strategy
    pub fn predict<S: AsRef<str>>(
        &mut self,
        query: &[S],
        background: &[S],
    ) -> Result<(ResultsTable, RunMetadata)> {
        self.align()?;
        self.register()?;
        let (query, background) = self.select_genes(query, background)?;
        self.execute(&query, &background)?;
        let table = self.merge()?;

        let selected_datasets: BTreeMap<String, Vec<String>> = self
            .results
            .iter()
            .filter(|r| !r.selected_datasets.is_empty())
            .map(|r| (r.assay.clone(), r.selected_datasets.clone()))
            .collect();

        let metadata = RunMetadata {
            species: self.data.species.clone(),
            query_symbols: query.symbols,
            background_symbols: background.symbols,
            assays: self.results.iter().map(|r| r.assay.clone()).collect(),
            selected_datasets,
            failed_assay: self.failure.clone(),
            hyperparameters: self
                .results
                .iter()
                .filter(|r| !r.hyperparameters.is_empty())
                .map(|r| (r.assay.clone(), r.hyperparameters.clone()))
                .collect(),
            workers: self.budget.as_ref().map(|b| b.workers).unwrap_or(1),
            log: self.log.entries().to_vec(),
        };

        Ok((table, metadata))
    }
}
