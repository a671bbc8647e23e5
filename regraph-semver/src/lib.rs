use semver::{Comparator, Op, VersionReq};
use std::cmp::Ordering;
use std::error::Error as StdError;
use std::fmt;

/// An npm-style constraint: one or more `||` separated semver requirements.
#[derive(Debug, Clone)]
pub struct RangeSet {
    ranges: Vec<VersionReq>,
}

#[derive(Debug, Clone)]
pub struct Error {
    input: String,
    message: String,
}

impl Error {
    fn new(input: &str, message: String) -> Self {
        Self {
            input: input.to_string(),
            message,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.input)
    }
}

impl StdError for Error {}

impl RangeSet {
    pub fn parse(original: &str) -> Result<Self, Error> {
        let mut s = original.trim();

        if s.is_empty() || s == "latest" {
            s = "*";
        }

        let mut ranges = Vec::new();

        for part in s.split("||") {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let normalized = normalize_and_part(part);

            let req = VersionReq::parse(&normalized)
                .map_err(|err| Error::new(original, err.to_string()))?;

            ranges.push(req);
        }

        if ranges.is_empty() {
            ranges.push(VersionReq::STAR);
        }

        Ok(RangeSet { ranges })
    }

    /// True when the set places no lower or upper bound at all (`*`, `latest`, empty).
    pub fn is_unbounded(&self) -> bool {
        self.ranges.iter().any(|r| r.comparators.is_empty())
    }

    /// Smallest version admitted by the set, ignoring prerelease tags.
    pub fn lowest_admissible(&self) -> Version {
        self.ranges
            .iter()
            .map(lower_bound_of_req)
            .min()
            .unwrap_or_else(|| Version::new(0, 0, 0))
    }
}

/// Picks the newer of two constraints declared for the same package.
///
/// Unbounded constraints (`latest`, `*`) beat bounded ones, otherwise the
/// constraint with the higher lowest admissible version wins. Ties and
/// unparseable pairs keep `current`; a parseable constraint beats an
/// unparseable one.
pub fn newer_constraint<'a>(current: &'a str, candidate: &'a str) -> &'a str {
    match compare_constraints(current, candidate) {
        Ordering::Less => candidate,
        _ => current,
    }
}

pub fn compare_constraints(left: &str, right: &str) -> Ordering {
    let parsed_left = RangeSet::parse(left).ok();
    let parsed_right = RangeSet::parse(right).ok();

    match (parsed_left, parsed_right) {
        (Some(l), Some(r)) => match (l.is_unbounded(), r.is_unbounded()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => l.lowest_admissible().cmp(&r.lowest_admissible()),
        },
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn lower_bound_of_req(req: &VersionReq) -> Version {
    // Comparators inside one requirement are ANDed, so the tightest lower bound applies.
    req.comparators
        .iter()
        .map(lower_bound_of_comparator)
        .max()
        .unwrap_or_else(|| Version::new(0, 0, 0))
}

fn lower_bound_of_comparator(comparator: &Comparator) -> Version {
    let major = comparator.major;
    let minor = comparator.minor.unwrap_or(0);
    let patch = comparator.patch.unwrap_or(0);

    match comparator.op {
        Op::Less | Op::LessEq => Version::new(0, 0, 0),
        // Saturate: registry data can carry `>18446744073709551615`.
        Op::Greater => match (comparator.minor, comparator.patch) {
            (None, _) => Version::new(major.saturating_add(1), 0, 0),
            (Some(_), None) => Version::new(major, minor.saturating_add(1), 0),
            (Some(_), Some(_)) => Version::new(major, minor, patch.saturating_add(1)),
        },
        _ => Version::new(major, minor, patch),
    }
}

fn normalize_and_part(part: &str) -> String {
    let tokens: Vec<&str> = part.split_whitespace().collect();

    if tokens.len() <= 1 {
        return part.to_string();
    }

    if tokens.len() == 3 && tokens[1] == "-" {
        return format!(">={}, <={}", tokens[0], tokens[2]);
    }

    let mut result = String::new();

    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            let prev = tokens[i - 1];
            if matches!(prev, "=" | ">" | ">=" | "<" | "<=" | "~" | "^") {
                result.push(' ');
            } else {
                result.push_str(", ");
            }
        }

        result.push_str(token);
    }
    result
}

pub use semver::Version;
