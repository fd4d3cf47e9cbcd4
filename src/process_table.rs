use crate::metrics::ProcessRecord;

/// Processes of the latest snapshot, busiest first.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    rows: Vec<ProcessRecord>,
}

impl ProcessTable {
    /// Replaces the table wholesale. The sort is stable, so processes with
    /// equal CPU keep their collection order.
    pub fn rebuild(&mut self, mut records: Vec<ProcessRecord>) {
        records.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
        self.rows = records;
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ProcessRecord] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::record;
    use proptest::prelude::*;

    fn pids(table: &ProcessTable) -> Vec<u32> {
        table.rows().iter().map(|r| r.pid).collect()
    }

    #[test]
    fn sorts_by_cpu_descending() {
        let mut table = ProcessTable::default();
        table.rebuild(vec![
            record(1, "init", 0.1),
            record(2, "compiler", 93.0),
            record(3, "shell", 4.5),
        ]);
        assert_eq!(pids(&table), vec![2, 3, 1]);
    }

    #[test]
    fn equal_cpu_keeps_input_order() {
        let mut table = ProcessTable::default();
        table.rebuild(vec![
            record(40, "b", 0.0),
            record(10, "a", 5.0),
            record(30, "c", 0.0),
            record(20, "d", 0.0),
        ]);
        assert_eq!(pids(&table), vec![10, 40, 30, 20]);
    }

    #[test]
    fn rebuild_replaces_previous_rows() {
        let mut table = ProcessTable::default();
        table.rebuild(vec![record(1, "a", 1.0), record(2, "b", 2.0)]);
        table.rebuild(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn duplicate_pids_are_not_merged() {
        let mut table = ProcessTable::default();
        table.rebuild(vec![record(5, "a", 1.0), record(5, "a", 1.0)]);
        assert_eq!(table.len(), 2);
    }

    proptest! {
        #[test]
        fn rebuild_is_deterministic_and_stable(cpus in proptest::collection::vec(0u8..5, 0..60)) {
            let records: Vec<ProcessRecord> = cpus
                .iter()
                .enumerate()
                .map(|(i, &cpu)| record(i as u32, "p", f64::from(cpu)))
                .collect();

            let mut first = ProcessTable::default();
            first.rebuild(records.clone());
            let mut second = ProcessTable::default();
            second.rebuild(records);
            prop_assert_eq!(pids(&first), pids(&second));

            for pair in first.rows().windows(2) {
                prop_assert!(pair[0].cpu_percent >= pair[1].cpu_percent);
                if pair[0].cpu_percent == pair[1].cpu_percent {
                    prop_assert!(pair[0].pid < pair[1].pid);
                }
            }
        }
    }
}
