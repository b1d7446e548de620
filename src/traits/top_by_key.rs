use itertools::Itertools;
use std::cmp::Reverse;

pub trait TopByKey: Iterator + Sized {
    /// Consumes an iterator, keeping the `count` items with the greatest key,
    /// greatest first. Items with equal keys keep the order they were yielded in.
    fn top_by_key<K: Ord>(
        self,
        count: usize,
        mut key: impl FnMut(&Self::Item) -> K,
    ) -> Vec<Self::Item> {
        let mut items = self.collect_vec();
        items.sort_by_key(|item| Reverse(key(item)));
        items.truncate(count);
        items
    }
}

impl<I> TopByKey for I where I: Iterator + Sized {}
