use serde_json::{Map, Value};

/// A path into a document's nested structure, one segment per nesting level.
pub type KeyPath = Vec<String>;

pub fn keypath(segments: &[&str]) -> KeyPath {
    segments.iter().map(|s| s.to_string()).collect()
}

/// Reads the value at `path`, if the whole path exists.
pub fn get_path<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut cur = doc;
    for seg in path {
        cur = cur.as_object()?.get(seg)?;
    }
    Some(cur)
}

/// Writes `value` at `path`, creating intermediate objects. Fails only if an
/// intermediate segment exists and is not an object.
pub fn set_path(doc: &mut Value, path: &[String], value: Value) -> bool {
    let Some((leaf, parents)) = path.split_last() else {
        return false;
    };
    let mut cur = doc;
    for seg in parents {
        let Some(map) = cur.as_object_mut() else {
            return false;
        };
        cur = map.entry(seg.clone()).or_insert_with(|| Value::Object(Map::new()));
    }
    match cur.as_object_mut() {
        Some(map) => {
            map.insert(leaf.clone(), value);
            true
        }
        None => false,
    }
}

/// Removes the leaf at `path`. Returns `false` if the path does not exist.
pub fn unset_path(doc: &mut Value, path: &[String]) -> bool {
    let Some((leaf, parents)) = path.split_last() else {
        return false;
    };
    let mut cur = doc;
    for seg in parents {
        match cur.as_object_mut().and_then(|m| m.get_mut(seg)) {
            Some(next) => cur = next,
            None => return false,
        }
    }
    cur.as_object_mut().map(|m| m.remove(leaf).is_some()).unwrap_or(false)
}

/// Adds `delta` to the numeric leaf at `path`. Returns `false` if the leaf is
/// missing or not a number.
pub fn inc_path(doc: &mut Value, path: &[String], delta: f64) -> bool {
    let Some((leaf, parents)) = path.split_last() else {
        return false;
    };
    let mut cur = doc;
    for seg in parents {
        match cur.as_object_mut().and_then(|m| m.get_mut(seg)) {
            Some(next) => cur = next,
            None => return false,
        }
    }
    let Some(map) = cur.as_object_mut() else {
        return false;
    };
    let Some(old) = map.get(leaf).and_then(|v| v.as_f64()) else {
        return false;
    };
    map.insert(leaf.clone(), Value::from(old + delta));
    true
}

/// A list of key paths to keep when reading documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection(pub Vec<KeyPath>);

impl Projection {
    pub fn new(paths: Vec<KeyPath>) -> Self {
        Self(paths)
    }

    pub fn of(paths: &[&[&str]]) -> Self {
        Self(paths.iter().map(|p| keypath(p)).collect())
    }

    /// Builds a document containing exactly the requested paths; paths absent
    /// from `doc` are simply left out.
    pub fn project(&self, doc: &Value) -> Value {
        let mut out = Value::Object(Map::new());
        for path in &self.0 {
            if let Some(found) = get_path(doc, path) {
                set_path(&mut out, path, found.clone());
            }
        }
        out
    }
}
