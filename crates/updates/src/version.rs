use std::cmp::Ordering;

/// Strip surrounding whitespace and a leading `v`.
pub fn normalize_version(value: &str) -> String {
    value.trim().trim_start_matches(['v', 'V']).to_owned()
}

/// A parsed dotted version: numeric release parts plus an optional
/// pre-release tag. Build metadata (`+...`) is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedVersion {
    release: Vec<u64>,
    pre: Option<String>,
}

fn parse_version(version: &str) -> Option<ParsedVersion> {
    let normalized = normalize_version(version);
    let without_build = normalized
        .split_once('+')
        .map_or(normalized.as_str(), |(v, _)| v);
    let (core, pre) = match without_build.split_once('-') {
        Some((core, pre)) => (core, Some(pre.to_owned())),
        None => (without_build, None),
    };
    let release = core
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    if release.is_empty() {
        return None;
    }
    Some(ParsedVersion { release, pre })
}

fn compare_pre(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            },
        }
    }
}

/// Compare two version strings. Missing release parts count as zero, and a
/// pre-release sorts before the release it precedes. `None` if either side
/// does not parse.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = parse_version(a)?;
    let b = parse_version(b)?;

    let len = a.release.len().max(b.release.len());
    for i in 0..len {
        let l = a.release.get(i).copied().unwrap_or(0);
        let r = b.release.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => {},
            ord => return Some(ord),
        }
    }

    Some(match (&a.pre, &b.pre) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(l), Some(r)) => compare_pre(l, r),
    })
}

pub fn is_newer_version(latest: &str, current: &str) -> bool {
    compare_versions(latest, current) == Some(Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("0.3.0", "0.2.9", true)]
    #[case("v1.0.0", "0.9.9", true)]
    #[case("1.10.0", "1.9.0", true)]
    #[case("1.0", "1.0.0", false)]
    #[case("1.0.1", "1.0", true)]
    #[case("0.2.5", "0.2.5", false)]
    #[case("0.2.4", "0.2.5", false)]
    #[case("latest", "0.2.5", false)]
    #[case("1.0.0", "1.0.0-beta.2", true)]
    #[case("1.0.0-beta.2", "1.0.0", false)]
    #[case("1.0.0-beta.11", "1.0.0-beta.2", true)]
    #[case("1.0.0-rc.1", "1.0.0-beta.9", true)]
    #[case("v0.2.5+build.42", "0.2.5", false)]
    fn newer(#[case] latest: &str, #[case] current: &str, #[case] expected: bool) {
        assert_eq!(is_newer_version(latest, current), expected);
    }

    #[test]
    fn unparsable_versions_do_not_compare() {
        assert_eq!(compare_versions("", "1.0.0"), None);
        assert_eq!(compare_versions("1.x", "1.0.0"), None);
    }

    #[test]
    fn normalizes_prefix_and_whitespace() {
        assert_eq!(normalize_version("  v2.1.0 "), "2.1.0");
    }
}
