//! Bounded source → AST memoisation.

use std::collections::VecDeque;
use std::sync::Arc;

use gridlang_parse::Expr;
use rustc_hash::FxHashMap;

/// An LRU map from formula source text to its parsed tree. Hits hand back
/// the same `Arc`, so repeated formulas across a sheet share one AST.
pub struct ParseCache {
    capacity: usize,
    map: FxHashMap<String, Arc<Expr>>,
    order: VecDeque<String>,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: FxHashMap::default(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&mut self, source: &str) -> Option<Arc<Expr>> {
        let hit = self.map.get(source).cloned();
        if hit.is_some() {
            self.touch(source);
        }
        hit
    }

    pub fn insert(&mut self, source: &str, ast: Arc<Expr>) {
        if self.map.insert(source.to_string(), ast).is_none() {
            self.order.push_back(source.to_string());
            if self.map.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.map.remove(&evicted);
                }
            }
        } else {
            self.touch(source);
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    fn touch(&mut self, source: &str) {
        if let Some(pos) = self.order.iter().position(|s| s == source) {
            let key = self.order.remove(pos).expect("position just found");
            self.order.push_back(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlang_parse::parse;

    fn ast(src: &str) -> Arc<Expr> {
        Arc::new(parse(src).unwrap())
    }

    #[test]
    fn hits_share_the_same_ast() {
        let mut cache = ParseCache::new(8);
        cache.insert("=1+2", ast("=1+2"));
        let a = cache.get("=1+2").unwrap();
        let b = cache.get("=1+2").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn lru_evicts_the_coldest_entry() {
        let mut cache = ParseCache::new(2);
        cache.insert("=1", ast("=1"));
        cache.insert("=2", ast("=2"));
        cache.get("=1"); // warm it
        cache.insert("=3", ast("=3"));
        assert!(cache.get("=1").is_some());
        assert!(cache.get("=2").is_none());
        assert!(cache.get("=3").is_some());
    }

    #[test]
    fn clear_forgets_everything() {
        let mut cache = ParseCache::new(4);
        cache.insert("=1", ast("=1"));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("=1").is_none());
    }
}
