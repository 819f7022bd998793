//! Deep traversal for deep watchers.

use std::collections::HashSet;

use super::Value;

/// Read everything reachable from `value` through tracked accessors, so the
/// active watcher subscribes to every nested property and container.
///
/// Each container is visited once, so cyclic data terminates.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    visit(value, &mut seen);
}

fn visit(value: &Value, seen: &mut HashSet<usize>) {
    match value {
        Value::Object(object) => {
            if !seen.insert(object.addr()) {
                return;
            }
            for key in object.keys() {
                if let Some(child) = object.get(&key) {
                    visit(&child, seen);
                }
            }
        }
        Value::Array(array) => {
            if !seen.insert(array.addr()) {
                return;
            }
            for item in array.to_vec() {
                visit(&item, seen);
            }
        }
        _ => {}
    }
}
