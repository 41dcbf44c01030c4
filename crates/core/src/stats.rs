use crate::model::Snapshot;
use std::collections::HashSet;

/// Header counters shown above the cards. Remote entries are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_items: u64,
    pub suspended: u64,
    pub windows: u64,
}

impl DashboardStats {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let items = snapshot.items();
        let occupied: HashSet<_> = items.iter().filter_map(|item| item.container_id).collect();

        Self {
            total_items: items.len() as u64,
            suspended: items.iter().filter(|item| item.discarded).count() as u64,
            windows: snapshot
                .containers()
                .iter()
                .filter(|container| occupied.contains(&container.id))
                .count() as u64,
        }
    }

    /// e.g. `12 total tabs • 3 suspended • across 2 windows`
    pub fn summary(&self) -> String {
        let plural = if self.windows > 1 { "s" } else { "" };
        format!(
            "{} total tabs • {} suspended • across {} window{plural}",
            self.total_items, self.suspended, self.windows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Annotations;
    use crate::testing;

    #[test]
    fn test_stats_count_local_items_and_occupied_windows() {
        let mut suspended = testing::tab(2, 10, "B", "https://b.test/");
        suspended.discarded = true;
        let snapshot = Snapshot::new(
            vec![testing::tab(1, 10, "A", "https://a.test/"), suspended],
            vec![testing::window(10), testing::window(11)],
            vec![testing::remote_tab("Phone", "https://r.test/")],
            Annotations::new(),
        );

        let stats = DashboardStats::from_snapshot(&snapshot);
        assert_eq!(
            stats,
            DashboardStats {
                total_items: 2,
                suspended: 1,
                windows: 1,
            }
        );
        assert_eq!(stats.summary(), "2 total tabs • 1 suspended • across 1 window");
    }

    #[test]
    fn test_summary_pluralizes_windows() {
        let stats = DashboardStats {
            total_items: 0,
            suspended: 0,
            windows: 0,
        };
        assert_eq!(stats.summary(), "0 total tabs • 0 suspended • across 0 window");

        let stats = DashboardStats {
            windows: 3,
            ..stats
        };
        assert_eq!(stats.summary(), "0 total tabs • 0 suspended • across 3 windows");
    }
}
