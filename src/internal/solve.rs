// SPDX-License-Identifier: MPL-2.0

//! The finite-domain search engine.
//!
//! Propagation is value elimination run to fixpoint over a queue of changed
//! variables with duplicate suppression: pinning a variable intersects every
//! dependency target with the matching table row, and any variable losing
//! values triggers a support re-check of the ranks whose tables mention it.
//!
//! Search is depth-first branch-and-bound. Variables branch in their fixed
//! problem order (top-level first, then discovery order) and values are
//! tried newest first with `ABSENT` last, so the first solution found is
//! already good; the search then keeps going, pruning with an optimistic
//! bound, until the lexicographically best assignment is proven:
//! top-level version deficits first, then the number of induced packages
//! present, then induced version deficits. Identical inputs always explore
//! the identical tree, so results are deterministic.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::internal::domain::{Change, DomainStore, ABSENT};
use crate::internal::problem::Problem;

/// The solve ran out of time or backtracks. Says nothing about feasibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BudgetExhausted;

/// Cooperative resource budget, checked at every backtrack and at fixpoint
/// boundaries.
#[derive(Debug, Clone)]
pub(crate) struct Budget {
    deadline: Option<Instant>,
    max_backtracks: Option<u64>,
    backtracks: u64,
}

impl Budget {
    pub(crate) fn new(timeout_ms: Option<u32>, max_backtracks: Option<u64>) -> Self {
        Self {
            deadline: timeout_ms.map(|ms| Instant::now() + Duration::from_millis(u64::from(ms))),
            max_backtracks,
            backtracks: 0,
        }
    }

    pub(crate) fn unlimited() -> Self {
        Self::new(None, None)
    }

    pub(crate) fn check(&self) -> Result<(), BudgetExhausted> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(BudgetExhausted),
            _ => Ok(()),
        }
    }

    fn note_backtrack(&mut self) -> Result<(), BudgetExhausted> {
        self.backtracks += 1;
        if self.max_backtracks.is_some_and(|max| self.backtracks > max) {
            return Err(BudgetExhausted);
        }
        self.check()
    }
}

/// Result of a search.
pub(crate) enum Outcome {
    /// The encoded value chosen for every variable, in variable order.
    Sat(Vec<usize>),
    /// No assignment satisfies the problem.
    Unsat,
}

/// One search over a compiled [Problem]. The solver owns all transient
/// state; the problem and graph are only read.
pub(crate) struct Solver<'p, 'g> {
    problem: &'p Problem<'g>,
    store: DomainStore,
    queue: VecDeque<u32>,
    queued: Vec<bool>,
    /// Per-variable count of domain wipe-outs, kept for diagnosis.
    pub(crate) wipeouts: Vec<u64>,
}

impl<'p, 'g> Solver<'p, 'g> {
    pub(crate) fn new(problem: &'p Problem<'g>) -> Self {
        let var_count = problem.var_count();
        Self {
            problem,
            store: DomainStore::new(problem.initial.clone()),
            queue: VecDeque::with_capacity(var_count),
            queued: vec![false; var_count],
            wipeouts: vec![0; var_count],
        }
    }

    /// Runs the search. With `stop_at_first` the solver returns the first
    /// feasible assignment found (diagnosis probes only need feasibility);
    /// otherwise it proves the lexicographically best one.
    pub(crate) fn solve(
        &mut self,
        budget: &mut Budget,
        stop_at_first: bool,
    ) -> Result<Outcome, BudgetExhausted> {
        // A domain can be empty straight out of the builder, e.g. when two
        // top-level constraints on one package are disjoint.
        for var in 0..self.store.var_count() as u32 {
            if self.store.domain(var).is_empty() {
                self.wipeouts[var as usize] += 1;
                return Ok(Outcome::Unsat);
            }
        }

        for var in 0..self.store.var_count() as u32 {
            self.enqueue(var);
        }
        if self.propagate().is_err() {
            return Ok(Outcome::Unsat);
        }
        budget.check()?;

        let mut best: Option<(Vec<u64>, Vec<usize>)> = None;
        self.dfs(budget, stop_at_first, &mut best)?;
        Ok(match best {
            Some((cost, values)) => {
                debug!("optimal cost {cost:?}");
                Outcome::Sat(values)
            }
            None => Outcome::Unsat,
        })
    }

    fn dfs(
        &mut self,
        budget: &mut Budget,
        stop_at_first: bool,
        best: &mut Option<(Vec<u64>, Vec<usize>)>,
    ) -> Result<bool, BudgetExhausted> {
        budget.check()?;
        if let Some((best_cost, _)) = best.as_ref() {
            // Every completion of this node costs at least the optimistic
            // bound, so an incumbent at or below it closes the branch.
            if &self.bound() >= best_cost {
                return Ok(false);
            }
        }

        let branch_var = (0..self.store.var_count() as u32)
            .find(|&var| self.store.domain(var).len() > 1);
        let var = match branch_var {
            None => {
                let cost = self.bound();
                let values: Vec<usize> = (0..self.store.var_count() as u32)
                    .map(|var| {
                        self.store
                            .domain(var)
                            .single()
                            .expect("complete assignment must be all singletons")
                    })
                    .collect();
                trace!("feasible assignment with cost {cost:?}");
                if best.as_ref().is_none_or(|(best_cost, _)| &cost < best_cost) {
                    *best = Some((cost, values));
                }
                return Ok(stop_at_first);
            }
            Some(var) => var,
        };

        let mut values: Vec<usize> = self.store.domain(var).iter().collect();
        // Newest first; ABSENT encodes as 0 and so lands last on its own.
        values.sort_unstable_by(|a, b| b.cmp(a));
        for value in values {
            self.store.push_level();
            self.store.pin(var, value);
            self.enqueue(var);
            let feasible = self.propagate().is_ok();
            let stop = if feasible {
                self.dfs(budget, stop_at_first, best)?
            } else {
                false
            };
            self.store.pop_level();
            trace!(
                "backtrack on {} from value {value}",
                self.package_name(var)
            );
            budget.note_backtrack()?;
            if stop {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn enqueue(&mut self, var: u32) {
        if !self.queued[var as usize] {
            self.queued[var as usize] = true;
            self.queue.push_back(var);
        }
    }

    /// Runs value elimination to fixpoint. On a wipe-out the conflicting
    /// variable is recorded and the queue is drained.
    fn propagate(&mut self) -> Result<(), u32> {
        let problem = self.problem;
        while let Some(var) = self.queue.pop_front() {
            self.queued[var as usize] = false;

            // A pinned version forces every dependency target into the
            // matching table row.
            if let Some(value) = self.store.domain(var).single() {
                if value != ABSENT {
                    for edge in &problem.deps[var as usize][value - 1] {
                        match self.store.intersect(edge.target, &edge.allowed) {
                            Change::Emptied => return Err(self.conflict(edge.target)),
                            Change::Narrowed => self.enqueue(edge.target),
                            Change::Unchanged => {}
                        }
                    }
                }
            }

            // Ranks whose tables mention this variable may have lost their
            // support.
            for &(owner, rank) in &problem.watchers[var as usize] {
                let value = rank as usize + 1;
                if !self.store.domain(owner).contains(value) {
                    continue;
                }
                let supported = problem.deps[owner as usize][rank as usize]
                    .iter()
                    .all(|edge| edge.allowed.intersects(self.store.domain(edge.target)));
                if !supported {
                    match self.store.remove(owner, value) {
                        Change::Emptied => return Err(self.conflict(owner)),
                        Change::Narrowed => self.enqueue(owner),
                        Change::Unchanged => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn conflict(&mut self, var: u32) -> u32 {
        debug!("domain wipe-out on {}", self.package_name(var));
        self.wipeouts[var as usize] += 1;
        while let Some(queued_var) = self.queue.pop_front() {
            self.queued[queued_var as usize] = false;
        }
        var
    }

    fn package_name(&self, var: u32) -> &str {
        self.problem
            .graph
            .name(self.problem.vars[var as usize].package)
    }

    /// Optimistic lexicographic cost of any completion of the current
    /// domains; exact once every domain is a singleton. Components:
    /// top-level version deficits in variable order, then the number of
    /// induced variables that cannot be `ABSENT`, then induced deficits.
    fn bound(&self) -> Vec<u64> {
        let var_count = self.store.var_count();
        let top_count = self.problem.top_count;
        let mut cost = Vec::with_capacity(var_count + 1);
        for var in 0..top_count {
            let newest = self
                .store
                .domain(var as u32)
                .max()
                .expect("bound on an emptied domain") as u64;
            cost.push(self.problem.max_value(var) as u64 - newest);
        }
        let present = (top_count..var_count)
            .filter(|&var| !self.store.domain(var as u32).contains(ABSENT))
            .count() as u64;
        cost.push(present);
        for var in top_count..var_count {
            let domain = self.store.domain(var as u32);
            if domain.contains(ABSENT) {
                cost.push(0);
            } else {
                let newest = domain.max().expect("bound on an emptied domain") as u64;
                cost.push(self.problem.max_value(var) as u64 - newest);
            }
        }
        cost
    }
}

// TESTS #######################################################################
