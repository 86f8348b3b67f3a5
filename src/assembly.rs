//! Compute the assembly index of a molecule.
//!
//! The search starts from a single fragment holding every bond and repeatedly
//! picks a duplicate pair: two isomorphic, non-overlapping connected subgraphs.
//! One copy is kept as a fragment of its own, the other is removed, and the
//! rest is split into connected pieces. Removing a duplicate of `s` bonds
//! saves `s - 1` joins, so the assembly index of a state is
//! `total_bonds - duplicate_bonds - 1`.
//!
//! The first state is enumerated from scratch (see
//! [`cold_enumeration`](crate::enumerate)); every later state walks the
//! resulting DAG. States are pruned with the bounds in [`crate::bounds`] and
//! deduplicated by canonical signature in a [`PathArena`].

use std::time::Instant;

use bit_set::BitSet;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    bounds::{
        addition_chain_bound, lower_bound, post_fragmentation_bound, prefix_max, size_table,
        split_bound,
    },
    canonize::Canonizer,
    config::AssemblyConfig,
    enumerate::{cold_enumeration, warm_enumeration, Dag, Halt},
    interrupt::{CancelToken, Interrupt},
    matches::Matching,
    memoize::{PathArena, PathId, Visit},
    molecule::{Molecule, MAX_BONDS},
    pathway::{reconstruct, Pathway},
    state::State,
};

/// Molecules the search refuses to start on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("molecule has {bonds} bonds, more than the supported {max}")]
    TooManyBonds { bonds: usize, max: usize },
    #[error("molecule has self-loops or parallel bonds")]
    Malformed,
}

/// How a search ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The search space was exhausted; the index is exact unless the
    /// enumeration was capped.
    Completed,
    /// The search was cancelled or ran out of time; the index is the best
    /// found so far and only an upper bound.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct AssemblyResult {
    pub index: u32,
    pub outcome: Outcome,
    /// The first enumeration pass hit `enum_max`; the index is an upper bound.
    pub enumeration_capped: bool,
    pub pathway: Option<Pathway>,
    pub states_visited: usize,
    pub canonical_classes: usize,
}

impl AssemblyResult {
    /// Return `true` if the index is known to be exact.
    pub fn is_exact(&self) -> bool {
        self.outcome == Outcome::Completed && !self.enumeration_capped
    }
}

/// Everything one search shares between its recursive calls.
struct Session<'a> {
    total_bonds: usize,
    canonizer: Canonizer<'a>,
    arena: PathArena,
    interrupt: Interrupt,
    enum_max: usize,
    best: usize,
    best_path: PathId,
    capped: bool,
    states: usize,
    started: Instant,
    /// Trip the interrupt once this many states have been entered.
    stop_after: Option<usize>,
    /// `best` at the moment `stop_after` tripped.
    best_at_stop: Option<usize>,
}

impl<'a> Session<'a> {
    fn new(target: &'a Molecule, total_bonds: usize, enum_max: usize, interrupt: Interrupt) -> Self {
        let arena = PathArena::new();
        Self {
            total_bonds,
            canonizer: Canonizer::new(target),
            best_path: arena.root(),
            arena,
            interrupt,
            enum_max,
            best: usize::MAX,
            capped: false,
            states: 0,
            started: Instant::now(),
            stop_after: None,
            best_at_stop: None,
        }
    }

    /// Record `state` as the best so far if it is. Return `false` if the search
    /// should stop.
    fn enter(&mut self, state: &State) -> bool {
        self.states += 1;
        let ix = state.assembly_index(self.total_bonds);
        if ix < self.best {
            self.best = ix;
            self.best_path = state.path();
            info!(
                "assembly index {ix} after {:.3?} ({} states)",
                self.started.elapsed(),
                self.states
            );
        }
        if self.stop_after.is_some_and(|n| self.states >= n) && !self.interrupt.is_tripped() {
            self.interrupt.trip();
            self.best_at_stop = Some(self.best);
        }
        !self.interrupt.poll()
    }

    fn beats_best(&self, bound: i64) -> bool {
        bound < self.best as i64
    }

    /// Memoize `child` and recurse into it unless an equal or better route to
    /// the same signature is known.
    fn descend(&mut self, parent: &State, mut child: State, matching: &Matching, dag: &Dag) {
        let (Some(matched), Some(removed)) = (
            self.canonizer.occurrence_index(&matching.kept),
            self.canonizer.occurrence_index(&matching.removed),
        ) else {
            return;
        };
        match self.arena.visit(
            child.signature().to_vec(),
            child.duplicate_bonds(),
            parent.path(),
            matched,
            removed,
        ) {
            Visit::New(id) | Visit::Improved(id) => {
                child.set_path(id);
                self.search(child, dag);
            }
            Visit::Dominated => {}
        }
    }

    /// Search from the root state, building the duplicate DAG on the way.
    fn search_root(&mut self, root: State) {
        if !self.enter(&root) {
            return;
        }

        let mol = self.canonizer.molecule();
        let (dag, levels) = match cold_enumeration(
            mol,
            root.fragments(),
            &mut self.canonizer,
            self.enum_max,
            &mut self.interrupt,
        ) {
            Ok(found) => found,
            Err(Halt::Capped) => {
                warn!(
                    "subgraph enumeration limit of {} reached; index is an upper bound",
                    self.enum_max
                );
                self.capped = true;
                return;
            }
            Err(Halt::Cancelled) => return,
        };
        debug!(
            "duplicate DAG: {} levels, {} nodes",
            dag.levels().len(),
            dag.node_count()
        );

        for level in levels.iter().rev() {
            for group in level.values() {
                if group.len() < 2 {
                    continue;
                }
                for matching in group.matchings().iter().rev() {
                    if self.interrupt.is_tripped() {
                        return;
                    }
                    let child = root.fragment(matching, &mut self.canonizer);
                    let savings = addition_chain_bound(&child.sizes(), child.fragments()[0].len());
                    let bound = self.total_bonds as i64 - child.duplicate_bonds() as i64 - 1 - savings;
                    if self.beats_best(bound) {
                        self.descend(&root, child, matching, &dag);
                    }
                }
            }
        }
    }

    fn search(&mut self, mut state: State, dag: &Dag) {
        if !self.enter(&state) {
            return;
        }

        let Ok(found) = warm_enumeration(dag, state.fragments(), state.ordinal(), &mut self.interrupt)
        else {
            return;
        };
        if let Some(pairs) = found.covered.first() {
            state.trim(pairs);
        }

        let table = prefix_max(&size_table(found.max_size, &found.covered));
        let sizes = state.sizes();
        let parent_bonds = self.total_bonds as i64 - state.duplicate_bonds() as i64 - 1;

        for (k, level) in found.levels.iter().enumerate().rev() {
            let size = k + 2;
            let mut running = vec![BitSet::new(); sizes.len()];
            let mut level_union = BitSet::new();
            for group in level.values() {
                if group.is_dead() {
                    continue;
                }
                let group_union = group.covered();
                for (seen, cover) in running.iter_mut().zip(group.coverage()) {
                    seen.union_with(cover);
                }
                level_union.union_with(&group_union);

                let counts: Vec<usize> = running.iter().map(BitSet::len).collect();
                let mut estimate = table[k] - 1;
                if size > 2 {
                    estimate = estimate.max(table[k - 1]);
                }
                let estimate = estimate.max(split_bound(&sizes, size, &counts));
                if !self.beats_best(parent_bonds - estimate) || group.len() < 2 {
                    continue;
                }

                for matching in group.matchings().iter().rev() {
                    if self.interrupt.is_tripped() {
                        return;
                    }
                    let child = state.fragment(matching, &mut self.canonizer);
                    let savings =
                        post_fragmentation_bound(child.fragments(), &group_union, &level_union);
                    let bound = lower_bound(
                        self.total_bonds,
                        child.duplicate_bonds(),
                        size,
                        savings,
                        &child.sizes(),
                    );
                    if self.beats_best(bound) {
                        self.descend(&state, child, matching, dag);
                    }
                }
            }
        }
    }
}

/// Compute the assembly index of `mol` with the default configuration and no
/// time limit.
pub fn index(mol: &Molecule) -> Result<u32, AssemblyError> {
    let config = AssemblyConfig {
        pathway: false,
        ..AssemblyConfig::default()
    };
    index_search(mol, &config, &CancelToken::new()).map(|result| result.index)
}

/// Run a full assembly search on `mol`.
///
/// Cancelling `token` (or running out of `config.run_time`) stops the search
/// early; the result then holds the best index found so far.
pub fn index_search(
    mol: &Molecule,
    config: &AssemblyConfig,
    token: &CancelToken,
) -> Result<AssemblyResult, AssemblyError> {
    run(mol, config, token, None).map(|(result, _)| result)
}

/// [`index_search`], optionally stopping after `stop_after` states. Also
/// returns the raw best index held when that stop fired.
fn run(
    mol: &Molecule,
    config: &AssemblyConfig,
    token: &CancelToken,
    stop_after: Option<usize>,
) -> Result<(AssemblyResult, Option<usize>), AssemblyError> {
    if mol.is_malformed() {
        return Err(AssemblyError::Malformed);
    }
    let input = if config.remove_hydrogens {
        mol.without_hydrogens()
    } else {
        mol.clone()
    };
    let total_bonds = input.bond_count();
    if total_bonds > MAX_BONDS {
        return Err(AssemblyError::TooManyBonds {
            bonds: total_bonds,
            max: MAX_BONDS,
        });
    }
    let components = input.component_count();

    let unique = input.unique_bonds();
    let target = input.without_bonds(&unique);
    debug!(
        "{total_bonds} bonds, {} structurally unique, {components} components",
        unique.len()
    );

    let mut session = Session::new(
        &target,
        total_bonds,
        config.enum_max,
        Interrupt::new(token.clone(), config.run_time),
    );
    session.stop_after = stop_after;
    if total_bonds > 0 {
        let root = State::root(target.all_bonds(), session.arena.root());
        session.search_root(root);
    }

    let outcome = if session.interrupt.is_tripped() {
        warn!("search cancelled; index is an upper bound");
        Outcome::Cancelled
    } else {
        Outcome::Completed
    };
    let mut ix = if total_bonds == 0 { 0 } else { session.best };
    if config.compensate_disjoint {
        ix = (ix + 1).saturating_sub(components);
    }
    info!(
        "finished in {:.3?}: {} states visited, {} canonical classes",
        session.started.elapsed(),
        session.states,
        session.canonizer.class_count()
    );

    let pathway = config.pathway.then(|| {
        reconstruct(
            &input,
            &target,
            &unique,
            &session.arena,
            session.best_path,
            &session.canonizer,
        )
    });

    let result = AssemblyResult {
        index: ix as u32,
        outcome,
        enumeration_capped: session.capped,
        pathway,
        states_visited: session.states,
        canonical_classes: session.canonizer.class_count(),
    };
    Ok((result, session.best_at_stop))
}
