//! Host version compatibility checks

/// Whether `host` is at least `minimum`.
///
/// Versions are compared as dotted numeric components with missing
/// components treated as zero; pre-release and build suffixes are ignored.
/// An unparseable version never satisfies the check.
pub fn satisfies_min_version(host: &str, minimum: &str) -> bool {
    match (parse(host), parse(minimum)) {
        (Some(host), Some(minimum)) => {
            let len = host.len().max(minimum.len());
            let pad = |v: &[u64]| -> Vec<u64> {
                let mut padded = v.to_vec();
                padded.resize(len, 0);
                padded
            };
            pad(&host) >= pad(&minimum)
        }
        _ => false,
    }
}

fn parse(version: &str) -> Option<Vec<u64>> {
    let core = version
        .trim()
        .trim_start_matches('v')
        .split(['-', '+'])
        .next()?;

    if core.is_empty() {
        return None;
    }

    core.split('.').map(|part| part.parse().ok()).collect()
}
