// Project classification into README buckets

use crate::models::{ProjectRecord, ProjectStatus};

/// Cursus ids and pass marks driving classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRules {
    /// Main curriculum (42cursus)
    pub main_cursus_id: u32,

    /// Preparatory pool (C Piscine)
    pub pool_cursus_id: u32,

    /// Lowest mark counting a main project as done
    pub main_pass_mark: i64,

    /// Lowest mark counting a pool project as passed; lower marks are dropped
    pub pool_pass_mark: i64,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            main_cursus_id: 21,
            pool_cursus_id: 9,
            main_pass_mark: 1,
            pool_pass_mark: 50,
        }
    }
}

/// A record after classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedProject {
    pub name: String,
    pub mark: i64,
    pub validated: bool,
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    /// Every main curriculum project, done or not
    Cursus,
    Completed,
    InProgress,
    /// Passed pool projects
    Piscine,
}

/// Named, name-sorted collection of classified projects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub kind: BucketKind,
    pub projects: Vec<ClassifiedProject>,
}

impl Bucket {
    fn new(kind: BucketKind) -> Self {
        Self {
            kind,
            projects: Vec::new(),
        }
    }

    fn sort(&mut self) {
        self.projects.sort_by_cached_key(|p| p.name.to_lowercase());
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Done/total over the main curriculum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    /// Integer percentage, truncated; 0 when there is nothing to count
    pub fn percentage(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            self.done * 100 / self.total
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buckets {
    pub cursus: Bucket,
    pub completed: Bucket,
    pub in_progress: Bucket,
    pub piscine: Bucket,
}

impl Buckets {
    pub fn progress(&self) -> Progress {
        Progress {
            done: self.completed.len(),
            total: self.cursus.len(),
        }
    }
}

/// Partition records by cursus and apply pass marks.
/// Records belonging to the main curriculum are never counted as pool work.
pub fn classify(records: &[ProjectRecord], rules: &ClassificationRules) -> Buckets {
    let mut buckets = Buckets {
        cursus: Bucket::new(BucketKind::Cursus),
        completed: Bucket::new(BucketKind::Completed),
        in_progress: Bucket::new(BucketKind::InProgress),
        piscine: Bucket::new(BucketKind::Piscine),
    };

    for record in records {
        let mark = record.mark_or_zero();

        if record.in_cursus(rules.main_cursus_id) {
            let project = ClassifiedProject {
                name: record.name.clone(),
                mark,
                validated: mark >= rules.main_pass_mark,
                status: record.status,
            };
            if project.validated {
                buckets.completed.projects.push(project.clone());
            } else {
                buckets.in_progress.projects.push(project.clone());
            }
            buckets.cursus.projects.push(project);
        } else if record.in_cursus(rules.pool_cursus_id) {
            if mark >= rules.pool_pass_mark {
                buckets.piscine.projects.push(ClassifiedProject {
                    name: record.name.clone(),
                    mark,
                    validated: true,
                    status: record.status,
                });
            } else {
                tracing::debug!("Pool project {} below pass mark ({})", record.name, mark);
            }
        } else {
            tracing::debug!(
                "Skipping {} (cursus {:?} not tracked)",
                record.name,
                record.cursus_ids
            );
        }
    }

    for bucket in [
        &mut buckets.cursus,
        &mut buckets.completed,
        &mut buckets.in_progress,
        &mut buckets.piscine,
    ] {
        bucket.sort();
    }

    tracing::info!(
        "Classified: {} cursus ({} done, {} in progress), {} piscine",
        buckets.cursus.len(),
        buckets.completed.len(),
        buckets.in_progress.len(),
        buckets.piscine.len()
    );

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main(name: &str, mark: Option<i64>) -> ProjectRecord {
        ProjectRecord::new(name, mark, vec![21])
    }

    fn pool(name: &str, mark: Option<i64>) -> ProjectRecord {
        ProjectRecord::new(name, mark, vec![9])
    }

    #[test]
    fn test_main_done_and_in_progress() {
        let records = vec![main("ft_printf", Some(100)), main("libft", Some(0))];
        let buckets = classify(&records, &ClassificationRules::default());

        assert_eq!(buckets.completed.names(), vec!["ft_printf"]);
        assert_eq!(buckets.in_progress.names(), vec!["libft"]);
        assert_eq!(buckets.cursus.len(), 2);
        assert!(buckets.piscine.is_empty());
    }

    #[test]
    fn test_null_mark_is_in_progress() {
        let buckets = classify(&[main("get_next_line", None)], &ClassificationRules::default());
        assert_eq!(buckets.in_progress.names(), vec!["get_next_line"]);
        assert_eq!(buckets.in_progress.projects[0].mark, 0);
    }

    #[test]
    fn test_pool_threshold() {
        let records = vec![pool("C 00", Some(55)), pool("C 01", Some(40)), pool("C 02", Some(50))];
        let buckets = classify(&records, &ClassificationRules::default());

        assert_eq!(buckets.piscine.names(), vec!["C 00", "C 02"]);
        assert!(buckets.cursus.is_empty());
    }

    #[test]
    fn test_pool_threshold_is_configurable() {
        let rules = ClassificationRules {
            pool_pass_mark: 51,
            ..ClassificationRules::default()
        };
        let buckets = classify(&[pool("C 02", Some(50)), pool("C 03", Some(51))], &rules);
        assert_eq!(buckets.piscine.names(), vec!["C 03"]);
    }

    #[test]
    fn test_main_takes_precedence_over_pool() {
        let record = ProjectRecord::new("Exam Rank 02", Some(100), vec![9, 21]);
        let buckets = classify(&[record], &ClassificationRules::default());

        assert_eq!(buckets.completed.names(), vec!["Exam Rank 02"]);
        assert!(buckets.piscine.is_empty());
    }

    #[test]
    fn test_untracked_cursus_is_skipped() {
        let buckets = classify(
            &[ProjectRecord::new("Hackathon", Some(100), vec![3])],
            &ClassificationRules::default(),
        );
        assert!(buckets.cursus.is_empty());
        assert!(buckets.piscine.is_empty());
    }

    #[test]
    fn test_sorted_case_insensitive() {
        let records = vec![
            main("push_swap", Some(84)),
            main("Born2beroot", Some(100)),
            main("libft", Some(125)),
            main("ft_printf", Some(100)),
        ];
        let buckets = classify(&records, &ClassificationRules::default());

        assert_eq!(
            buckets.cursus.names(),
            vec!["Born2beroot", "ft_printf", "libft", "push_swap"]
        );
    }

    #[test]
    fn test_progress() {
        let records = vec![
            main("a", Some(100)),
            main("b", Some(0)),
            main("c", Some(90)),
            pool("d", Some(100)),
        ];
        let progress = classify(&records, &ClassificationRules::default()).progress();

        assert_eq!(progress, Progress { done: 2, total: 3 });
        assert_eq!(progress.percentage(), 66);
        assert_eq!(Progress { done: 0, total: 0 }.percentage(), 0);
    }
}
