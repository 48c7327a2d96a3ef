use depmap_core::path::normalize_path;
use depmap_core::{DepMapError, GlobalKeyMap, Result};

/// Resolves a key string to its path, using `context_path` to disambiguate
/// when more than one path shares the key string (keys are contextual, not
/// globally unique). Returns `AmbiguousLookup` rather than guessing.
pub fn get_path_from_key(
    key_string: &str,
    map: &GlobalKeyMap,
    context_path: Option<&str>,
) -> Result<Option<String>> {
    let matches: Vec<_> = map.values().filter(|info| info.key_string == key_string).collect();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches[0].norm_path.clone())),
        _ => {
            if let Some(ctx) = context_path {
                let norm_ctx = normalize_path(ctx);
                if let Some(hit) = matches
                    .iter()
                    .find(|info| info.parent_path.as_deref() == Some(norm_ctx.as_str()))
                {
                    return Ok(Some(hit.norm_path.clone()));
                }
            }
            Err(DepMapError::AmbiguousLookup {
                key: key_string.to_string(),
                candidates: matches.iter().map(|info| info.norm_path.clone()).collect(),
            })
        }
    }
}

pub fn get_key_from_path(path: &str, map: &GlobalKeyMap) -> Option<String> {
    let norm_path = normalize_path(path);
    map.get(&norm_path).map(|info| info.key_string.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depmap_core::KeyInfo;

    fn make(path: &str, key: &str, parent: Option<&str>) -> (String, depmap_core::KeyInfo) {
        (
            path.to_string(),
            KeyInfo {
                key_string: key.to_string(),
                norm_path: path.to_string(),
                parent_path: parent.map(|p| p.to_string()),
                tier: 1,
                is_directory: false,
            },
        )
    }

    #[test]
    fn unique_key_resolves_directly() {
        let mut map = GlobalKeyMap::new();
        let (p, k) = make("/repo/a.rs", "1A1", Some("/repo"));
        map.insert(p.clone(), k);
        assert_eq!(get_path_from_key("1A1", &map, None).unwrap(), Some(p));
    }

    #[test]
    fn ambiguous_key_without_context_errors() {
        let mut map = GlobalKeyMap::new();
        let (p1, k1) = make("/repo/a/x.rs", "1A1", Some("/repo/a"));
        let (p2, k2) = make("/repo/b/x.rs", "1A1", Some("/repo/b"));
        map.insert(p1, k1);
        map.insert(p2, k2);
        assert!(matches!(
            get_path_from_key("1A1", &map, None),
            Err(DepMapError::AmbiguousLookup { .. })
        ));
    }

    #[test]
    fn ambiguous_key_with_context_resolves() {
        let mut map = GlobalKeyMap::new();
        let (p1, k1) = make("/repo/a/x.rs", "1A1", Some("/repo/a"));
        let (p2, k2) = make("/repo/b/x.rs", "1A1", Some("/repo/b"));
        map.insert(p1.clone(), k1);
        map.insert(p2, k2);
        assert_eq!(
            get_path_from_key("1A1", &map, Some("/repo/a")).unwrap(),
            Some(p1)
        );
    }

    #[test]
    fn get_key_from_path_round_trips() {
        let mut map = GlobalKeyMap::new();
        let (p, k) = make("/repo/a.rs", "1A1", Some("/repo"));
        map.insert(p.clone(), k);
        assert_eq!(get_key_from_path(&p, &map), Some("1A1".to_string()));
        assert_eq!(get_key_from_path("/nope", &map), None);
    }
}
