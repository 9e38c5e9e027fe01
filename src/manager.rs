use anyhow::Result;
use rayon::prelude::*;

use crate::layout::{self, solve, BlockTree, LayoutConfig, Rect, WeightTable};
use crate::output::{self, RecordSink, RectRecord, SinkPolicy};
use crate::tree::arena::EntityTree;

/// Outcome of a full run over all revisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Revisions the sink accepted
    pub emitted: usize,
    /// Revisions the sink rejected (only with `SinkPolicy::Continue`)
    pub failed: Vec<usize>,
}

/// Drives the layout through every revision: packs once from revision 0,
/// then only re-solves coordinates.
pub struct TreemapManager<'a> {
    entities: &'a EntityTree,
    blocks: BlockTree,
    base: Rect,
    revision: usize,
}

impl<'a> TreemapManager<'a> {
    /// Pack the root's children into `base` and solve revision 0.
    pub fn new(entities: &'a EntityTree, base: Rect, config: &LayoutConfig) -> Self {
        let blocks = layout::build_block_tree(entities, base, config);
        let mut manager = Self {
            entities,
            blocks,
            base,
            revision: 0,
        };
        manager.solve(0);
        manager
    }

    pub fn blocks(&self) -> &BlockTree {
        &self.blocks
    }

    /// Revision currently held in the block rectangles.
    pub fn revision(&self) -> usize {
        self.revision
    }

    pub fn number_of_revisions(&self) -> usize {
        self.entities.number_of_revisions()
    }

    /// Reset the root to the base rectangle and solve `revision` in place.
    pub fn solve(&mut self, revision: usize) {
        let weights = WeightTable::compute(&self.blocks, self.entities, revision);
        self.blocks.set_root_rect(self.base);
        solve::solve(&mut self.blocks, &weights);
        self.revision = revision;
        tracing::debug!(
            "Solved revision {} (total weight {:.2})",
            revision,
            weights.full_weight(self.blocks.root())
        );
    }

    /// Records for the geometry currently held in the tree.
    pub fn records(&self) -> Vec<RectRecord> {
        output::collect_records(&self.blocks, self.blocks.rects(), self.entities)
    }

    /// Solve `revision` and return its sorted records.
    pub fn layout_revision(&mut self, revision: usize) -> Vec<RectRecord> {
        self.solve(revision);
        self.records()
    }

    /// Solve and emit every revision in order.
    pub fn run(&mut self, sink: &mut dyn RecordSink, policy: SinkPolicy) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for revision in 0..self.number_of_revisions() {
            let records = self.layout_revision(revision);
            emit(sink, revision, &records, policy, &mut summary)?;
        }
        log_summary(&summary);
        Ok(summary)
    }

    /// Solve all revisions on the rayon pool, each against its own copy of the
    /// geometry, then emit them in revision order. Output matches `run`; the
    /// tree's own rectangles are left untouched.
    pub fn run_parallel(&self, sink: &mut dyn RecordSink, policy: SinkPolicy) -> Result<RunSummary> {
        let root = self.blocks.root();
        let solved: Vec<Vec<RectRecord>> = (0..self.number_of_revisions())
            .into_par_iter()
            .map(|revision| {
                let weights = WeightTable::compute(&self.blocks, self.entities, revision);
                let mut rects = self.blocks.rects().to_vec();
                rects[root.index()] = self.base;
                solve::solve_into(self.blocks.blocks(), root, &weights, &mut rects);
                output::collect_records(&self.blocks, &rects, self.entities)
            })
            .collect();

        let mut summary = RunSummary::default();
        for (revision, records) in solved.iter().enumerate() {
            emit(sink, revision, records, policy, &mut summary)?;
        }
        log_summary(&summary);
        Ok(summary)
    }
}

fn emit(
    sink: &mut dyn RecordSink,
    revision: usize,
    records: &[RectRecord],
    policy: SinkPolicy,
    summary: &mut RunSummary,
) -> Result<()> {
    match sink.emit(revision, records) {
        Ok(()) => summary.emitted += 1,
        Err(e) => match policy {
            SinkPolicy::Abort => {
                return Err(e.context(format!("Failed to emit revision {}", revision)));
            }
            SinkPolicy::Continue => {
                tracing::error!("Failed to emit revision {}: {:#}", revision, e);
                summary.failed.push(revision);
            }
        },
    }
    Ok(())
}

fn log_summary(summary: &RunSummary) {
    tracing::info!(
        "Emitted {} revisions ({} failed)",
        summary.emitted,
        summary.failed.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Block;
    use crate::output::MemorySink;
    use crate::scanner::types::RawEntry;
    use anyhow::bail;
    use compact_str::CompactString;

    /// `revisions[r]` lists `(id, weight)` pairs for revision r.
    fn entities(revisions: &[&[(&str, f64)]]) -> EntityTree {
        let mut raw = Vec::new();
        for (revision, entries) in revisions.iter().enumerate() {
            for &(id, weight) in entries.iter() {
                raw.push(RawEntry {
                    id: CompactString::new(id),
                    revision,
                    weight,
                });
            }
        }
        crate::tree::build_tree("root", &raw, revisions.len()).unwrap()
    }

    fn base() -> Rect {
        Rect::sized(1000.0, 1000.0)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn find<'r>(records: &'r [RectRecord], id: &str) -> &'r RectRecord {
        records.iter().find(|r| r.id == id).unwrap()
    }

    #[test]
    fn two_entities_split_three_to_one() {
        let tree = entities(&[&[("A", 3.0), ("B", 1.0)]]);
        let mut manager = TreemapManager::new(&tree, base(), &LayoutConfig::default());
        let records = manager.layout_revision(0);

        assert_eq!(records.len(), 2);
        let a = find(&records, "A").rect;
        let b = find(&records, "B").rect;
        assert!(close(a.width, 750.0) && close(b.width, 250.0));
        assert!(close(a.height, 1000.0) && close(b.height, 1000.0));
        assert!(close(a.width + b.width, 1000.0));
        assert!(close(a.x, 0.0) && close(b.x, 750.0));
    }

    #[test]
    fn single_entity_fills_base() {
        let tree = entities(&[&[("only", 5.0)]]);
        let mut manager = TreemapManager::new(&tree, base(), &LayoutConfig::default());
        let records = manager.layout_revision(0);

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].to_string(),
            "only,0.0000000000,0.0000000000,1000.0000000000,1000.0000000000"
        );
    }

    #[test]
    fn weight_changes_keep_structure_and_invert_proportions() {
        let tree = entities(&[&[("A", 3.0), ("B", 1.0)], &[("A", 1.0), ("B", 3.0)]]);
        let mut manager = TreemapManager::new(&tree, base(), &LayoutConfig::default());

        let before: Vec<Block> = manager.blocks().blocks().to_vec();
        let rev0 = manager.layout_revision(0);
        let rev1 = manager.layout_revision(1);
        assert_eq!(manager.blocks().blocks(), before.as_slice());

        let (a0, b0) = (find(&rev0, "A").rect, find(&rev0, "B").rect);
        let (a1, b1) = (find(&rev1, "A").rect, find(&rev1, "B").rect);
        assert!(close(a0.width, 750.0) && close(b0.width, 250.0));
        assert!(close(a1.width, 250.0) && close(b1.width, 750.0));
        // A stays left of B
        assert!(a1.x < b1.x);
        assert!(close(b1.x, 250.0));
    }

    #[test]
    fn zero_weight_at_first_revision_is_never_emitted() {
        let tree = entities(&[
            &[("A", 1.0), ("Z", 0.0)],
            &[("A", 1.0), ("Z", 5.0)],
        ]);
        let mut manager = TreemapManager::new(&tree, base(), &LayoutConfig::default());
        let mut sink = MemorySink::default();
        manager.run(&mut sink, SinkPolicy::Continue).unwrap();

        assert_eq!(sink.revisions.len(), 2);
        for (_, records) in &sink.revisions {
            assert!(records.iter().all(|r| r.id != "Z"));
            assert_eq!(records.len(), 1);
        }
    }

    fn churn() -> EntityTree {
        entities(&[
            &[("a", 10.0), ("b", 7.0), ("C", 5.0), ("d", 3.0), ("e", 2.0), ("f", 1.0), ("g", 1.0)],
            &[("a", 0.0), ("b", 9.0), ("C", 5.0), ("d", 0.0), ("e", 8.0), ("f", 1.0), ("g", 4.0)],
            &[("a", 0.0), ("b", 0.0), ("C", 0.0), ("d", 0.0), ("e", 0.0), ("f", 0.0), ("g", 0.0)],
            &[("a", 2.0), ("b", 2.0), ("C", 2.0), ("d", 2.0), ("e", 2.0), ("f", 2.0), ("g", 2.0)],
        ])
    }

    #[test]
    fn every_revision_conserves_area_and_stays_non_negative() {
        let tree = churn();
        let mut manager = TreemapManager::new(&tree, base(), &LayoutConfig::default());
        let mut sink = MemorySink::default();
        let summary = manager.run(&mut sink, SinkPolicy::Abort).unwrap();
        assert_eq!(summary.emitted, 4);

        for (revision, records) in &sink.revisions {
            for r in records {
                assert!(r.rect.width >= 0.0 && r.rect.height >= 0.0, "{} @ {}", r.id, revision);
                assert!(r.rect.width.is_finite() && r.rect.height.is_finite());
            }
            let area: f64 = records.iter().map(|r| r.rect.area()).sum();
            if *revision == 2 {
                assert!(close(area, 0.0));
            } else {
                assert!(((area - 1_000_000.0) / 1_000_000.0).abs() <= 1e-6, "revision {}", revision);
            }
        }
    }

    #[test]
    fn records_are_sorted_case_insensitively() {
        let tree = churn();
        let mut manager = TreemapManager::new(&tree, base(), &LayoutConfig::default());
        let ids: Vec<String> = manager
            .layout_revision(0)
            .iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "C", "d", "e", "f", "g"]);
    }

    #[test]
    fn runs_are_deterministic_and_parallel_matches_sequential() {
        let tree = churn();
        let render = |sink: &MemorySink| -> Vec<String> {
            sink.revisions
                .iter()
                .map(|(_, records)| output::render_records(records))
                .collect()
        };

        let mut first = MemorySink::default();
        TreemapManager::new(&tree, base(), &LayoutConfig::default())
            .run(&mut first, SinkPolicy::Abort)
            .unwrap();
        let mut second = MemorySink::default();
        TreemapManager::new(&tree, base(), &LayoutConfig::default())
            .run(&mut second, SinkPolicy::Abort)
            .unwrap();
        let mut parallel = MemorySink::default();
        TreemapManager::new(&tree, base(), &LayoutConfig::default())
            .run_parallel(&mut parallel, SinkPolicy::Abort)
            .unwrap();

        assert_eq!(render(&first), render(&second));
        assert_eq!(render(&first), render(&parallel));
        let order: Vec<usize> = parallel.revisions.iter().map(|(r, _)| *r).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn nested_layout_conserves_leaf_area_across_revisions() {
        let tree = entities(&[
            &[("src/a", 4.0), ("src/b", 2.0), ("docs/c", 3.0), ("README", 1.0)],
            &[("src/a", 1.0), ("src/b", 6.0), ("docs/c", 0.0), ("README", 3.0)],
        ]);
        let config = LayoutConfig {
            nested: true,
            ..LayoutConfig::default()
        };
        let mut manager = TreemapManager::new(&tree, base(), &config);

        for revision in 0..2 {
            manager.solve(revision);
            let blocks = manager.blocks();
            let leaf_area: f64 = blocks
                .entity_blocks()
                .filter(|&(b, _)| blocks.is_leaf(b))
                .map(|(b, _)| blocks.rect(b).area())
                .sum();
            assert!(((leaf_area - 1_000_000.0) / 1_000_000.0).abs() <= 1e-6);
        }

        let ids: Vec<String> = manager.records().iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["docs", "docs/c", "README", "src", "src/a", "src/b"]);
    }

    struct FailingSink {
        fail_on: usize,
        seen: Vec<usize>,
    }

    impl RecordSink for FailingSink {
        fn emit(&mut self, revision: usize, _records: &[RectRecord]) -> Result<()> {
            if revision == self.fail_on {
                bail!("disk full");
            }
            self.seen.push(revision);
            Ok(())
        }
    }

    #[test]
    fn sink_failures_follow_policy() {
        let tree = churn();

        let mut sink = FailingSink { fail_on: 1, seen: Vec::new() };
        let summary = TreemapManager::new(&tree, base(), &LayoutConfig::default())
            .run(&mut sink, SinkPolicy::Continue)
            .unwrap();
        assert_eq!(summary, RunSummary { emitted: 3, failed: vec![1] });
        assert_eq!(sink.seen, vec![0, 2, 3]);

        let mut sink = FailingSink { fail_on: 1, seen: Vec::new() };
        let err = TreemapManager::new(&tree, base(), &LayoutConfig::default())
            .run(&mut sink, SinkPolicy::Abort)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("disk full"));
        assert_eq!(sink.seen, vec![0]);
    }
}
