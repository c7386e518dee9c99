use serde::Deserialize;

/// One repository as returned by the listing API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[cfg_attr(test, derive(serde::Serialize))]
pub struct Repository {
    pub name: String,
    pub fork: bool,
    pub clone_url: String,
    pub private: bool,
}

/// Keeps the repositories selected by the inclusion flags, in input order.
///
/// Passing neither flag selects everything, same as passing both.
pub fn filter(
    repositories: Vec<Repository>,
    include_source: bool,
    include_forks: bool,
) -> Vec<Repository> {
    let (include_source, include_forks) = if !include_source && !include_forks {
        (true, true)
    } else {
        (include_source, include_forks)
    };

    repositories
        .into_iter()
        .filter(|r| (r.fork && include_forks) || (!r.fork && include_source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository(name: &str, fork: bool) -> Repository {
        Repository {
            name: String::from(name),
            fork,
            clone_url: format!("https://github.com/someone/{}.git", name),
            private: false,
        }
    }

    fn sample() -> Vec<Repository> {
        vec![
            repository("a", true),
            repository("b", false),
            repository("c", true),
            repository("d", false),
            repository("e", true),
        ]
    }

    fn names(repositories: &[Repository]) -> Vec<&str> {
        repositories.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn no_flags_means_everything() {
        assert_eq!(filter(sample(), false, false), filter(sample(), true, true));
        assert_eq!(filter(sample(), false, false), sample());
    }

    #[test]
    fn source_only() {
        let selected = filter(sample(), true, false);
        assert_eq!(selected.len(), 2);
        assert_eq!(names(&selected), vec!["b", "d"]);
        assert!(selected.iter().all(|r| !r.fork));
    }

    #[test]
    fn forks_only() {
        let selected = filter(sample(), false, true);
        assert_eq!(names(&selected), vec!["a", "c", "e"]);
        assert!(selected.iter().all(|r| r.fork));
    }

    #[test]
    fn partition_is_exact() {
        for (source, forks) in [(true, false), (false, true), (true, true)] {
            let selected = filter(sample(), source, forks);
            let expected: Vec<Repository> = sample()
                .into_iter()
                .filter(|r| if r.fork { forks } else { source })
                .collect();
            assert_eq!(selected, expected, "source={} forks={}", source, forks);
        }
    }

    #[test]
    fn empty_input() {
        assert!(filter(Vec::new(), true, true).is_empty());
    }

    #[test]
    fn deserialize_ignores_extra_fields() {
        let json = r#"[{"id": 1, "name": "foo", "fork": false, "private": true,
            "clone_url": "https://github.com/someone/foo.git", "html_url": "x"}]"#;
        let repositories: Vec<Repository> = serde_json::from_str(json).unwrap();
        assert_eq!(
            repositories,
            vec![Repository {
                name: String::from("foo"),
                fork: false,
                clone_url: String::from("https://github.com/someone/foo.git"),
                private: true,
            }]
        );
    }
}
