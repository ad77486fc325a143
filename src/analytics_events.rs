// Copyright 2020 New Relic Corporation. (for the original go-agent)
// Copyright 2020 Masaki Hara.

use log::warn;
use serde::Serialize;

use crate::domain_defs::AgentRunId;
use crate::limits::FAILED_EVENTS_ATTEMPTS_LIMIT;
use crate::payload_creator::PayloadError;
use crate::payloads::analytics_events::{CollectorPayload, Properties};
use crate::priority::Priority;

/// Capacity-bounded, priority-weighted sampling reservoir.
///
/// While under capacity every offered event is kept.  Once full, a new offer
/// competes against the minimum-priority slot and replaces it unless the
/// newcomer's priority is strictly lower; ties go to the newcomer, so the
/// sample is never biased by arrival order.  The minimum slot index is
/// tracked across offers and recomputed with a full scan after each
/// eviction.
#[derive(Debug, Clone)]
pub(crate) struct AnalyticsEvents<E> {
    num_seen: u64,
    failed_harvests: u32,
    capacity: usize,
    events: Vec<(Priority, E)>,
    min_index: usize,
}

impl<E> AnalyticsEvents<E> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            num_seen: 0,
            failed_harvests: 0,
            capacity,
            events: Vec::with_capacity(capacity),
            min_index: 0,
        }
    }

    pub(crate) fn add(&mut self, priority: Priority, event: E) {
        self.num_seen += 1;
        if self.capacity == 0 {
            return;
        }
        if self.events.len() < self.capacity {
            if self.events.is_empty() || priority.is_lower_priority(self.events[self.min_index].0)
            {
                self.min_index = self.events.len();
            }
            self.events.push((priority, event));
            return;
        }
        if priority.is_lower_priority(self.events[self.min_index].0) {
            return;
        }
        self.events[self.min_index] = (priority, event);
        self.min_index = self.find_min();
    }

    fn find_min(&self) -> usize {
        let mut min_index = 0;
        for (i, (priority, _)) in self.events.iter().enumerate() {
            if priority.is_lower_priority(self.events[min_index].0) {
                min_index = i;
            }
        }
        min_index
    }

    /// Re-offers all of `other`'s events through the sampling competition,
    /// preserving the combined seen count.
    pub(crate) fn merge(&mut self, other: AnalyticsEvents<E>) {
        let all_seen = self.num_seen + other.num_seen;
        for (priority, event) in other.events {
            self.add(priority, event);
        }
        self.num_seen = all_seen;
    }

    /// Merge from a cycle whose delivery failed.  Bounded: once a payload
    /// has failed more than `FAILED_EVENTS_ATTEMPTS_LIMIT` times its events
    /// are dropped rather than retried again.
    pub(crate) fn merge_failed(&mut self, other: AnalyticsEvents<E>) {
        let fails = other.failed_harvests() + 1;
        if fails > FAILED_EVENTS_ATTEMPTS_LIMIT {
            warn!(
                "dropping {} events after {} failed delivery attempts",
                other.events.len(),
                fails
            );
            return;
        }
        self.failed_harvests = fails;
        self.merge(other);
    }

    /// Partitions the held events into contiguous chunks of at most
    /// `chunk_size`, covering every event exactly once.  The total seen
    /// count is preserved by crediting the overflow to the first chunk.
    pub(crate) fn split_into(mut self, chunk_size: usize) -> Vec<AnalyticsEvents<E>> {
        assert!(chunk_size > 0);
        let overflow = self.num_seen - self.events.len() as u64;
        let mut chunks = Vec::new();
        while !self.events.is_empty() {
            let tail = self.events.split_off(self.events.len().saturating_sub(chunk_size));
            let mut chunk = AnalyticsEvents {
                num_seen: tail.len() as u64,
                failed_harvests: self.failed_harvests,
                capacity: self.capacity,
                events: tail,
                min_index: 0,
            };
            chunk.min_index = chunk.find_min();
            chunks.push(chunk);
        }
        chunks.reverse();
        if let Some(first) = chunks.first_mut() {
            first.num_seen += overflow;
        }
        chunks
    }

    /// Drops every held event past `limit`, in reservoir order.
    pub(crate) fn truncate(&mut self, limit: usize) {
        if self.events.len() > limit {
            warn!(
                "dropping {} events over the per-payload limit",
                self.events.len() - limit
            );
            self.events.truncate(limit);
            self.min_index = self.find_min();
        }
    }

    pub(crate) fn num_seen(&self) -> u64 {
        self.num_seen
    }

    pub(crate) fn num_saved(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn failed_harvests(&self) -> u32 {
        self.failed_harvests
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn events(&self) -> impl Iterator<Item = &E> {
        self.events.iter().map(|(_, event)| event)
    }
}

impl<E: Serialize> AnalyticsEvents<E> {
    /// Serialized event envelope, or `None` when the reservoir is empty.
    pub(crate) fn collector_json(
        &self,
        agent_run_id: &AgentRunId,
    ) -> Result<Option<Vec<u8>>, PayloadError> {
        if self.is_empty() {
            return Ok(None);
        }
        let payload = CollectorPayload {
            agent_run_id: agent_run_id.clone(),
            properties: Properties {
                reservoir_size: self.capacity() as i32,
                events_seen: self.num_seen() as i64,
            },
            events: self.events().collect(),
        };
        Ok(Some(serde_json::to_vec(&payload)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservoir_with(capacity: usize, priorities: &[f32]) -> AnalyticsEvents<usize> {
        let mut events = AnalyticsEvents::new(capacity);
        for (i, &p) in priorities.iter().enumerate() {
            events.add(Priority(p), i);
        }
        events
    }

    fn held_priorities(events: &AnalyticsEvents<usize>) -> Vec<f32> {
        let mut ps: Vec<f32> = events.events.iter().map(|(p, _)| p.0).collect();
        ps.sort_by(|a, b| a.partial_cmp(b).unwrap());
        ps
    }

    #[test]
    fn test_under_capacity_keeps_everything() {
        let events = reservoir_with(4, &[0.9, 0.1, 0.5]);
        assert_eq!(events.num_seen(), 3);
        assert_eq!(events.num_saved(), 3);
    }

    #[test]
    fn test_full_reservoir_keeps_highest_priorities() {
        let events = reservoir_with(3, &[0.1, 0.9, 0.2, 0.8, 0.05, 0.7]);
        assert_eq!(events.num_seen(), 6);
        assert_eq!(events.num_saved(), 3);
        assert_eq!(held_priorities(&events), vec![0.7, 0.8, 0.9]);
    }

    #[test]
    fn test_low_priority_offer_loses() {
        let mut events = reservoir_with(2, &[0.5, 0.6]);
        events.add(Priority(0.1), 99);
        assert_eq!(held_priorities(&events), vec![0.5, 0.6]);
    }

    #[test]
    fn test_tie_goes_to_newcomer() {
        let mut events = reservoir_with(2, &[0.5, 0.6]);
        events.add(Priority(0.5), 99);
        assert_eq!(held_priorities(&events), vec![0.5, 0.6]);
        assert!(events.events.iter().any(|&(_, e)| e == 99));
    }

    #[test]
    fn test_zero_capacity() {
        let events = reservoir_with(0, &[0.5, 0.6]);
        assert_eq!(events.num_seen(), 2);
        assert_eq!(events.num_saved(), 0);
    }

    #[test]
    fn test_merge_preserves_seen_count() {
        let mut current = reservoir_with(10, &[0.5]);
        let failed = reservoir_with(10, &[0.6, 0.7]);
        current.merge(failed);
        assert_eq!(current.num_seen(), 3);
        assert_eq!(current.num_saved(), 3);
    }

    #[test]
    fn test_merge_failed_single_retry() {
        let mut current: AnalyticsEvents<usize> = AnalyticsEvents::new(10);
        let failed = reservoir_with(10, &[0.5, 0.6]);
        current.merge_failed(failed);
        assert_eq!(current.failed_harvests(), 1);
        assert_eq!(current.num_saved(), 2);

        // A second failure of the same data drops it.
        let mut next: AnalyticsEvents<usize> = AnalyticsEvents::new(10);
        next.merge_failed(current);
        assert_eq!(next.failed_harvests(), 0);
        assert_eq!(next.num_saved(), 0);
    }

    #[test]
    fn test_split_covers_all_events() {
        let events = reservoir_with(10, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]);
        let chunks = events.split_into(3);
        assert_eq!(chunks.len(), 3);
        let total_saved: usize = chunks.iter().map(|c| c.num_saved()).sum();
        let total_seen: u64 = chunks.iter().map(|c| c.num_seen()).sum();
        assert_eq!(total_saved, 7);
        assert_eq!(total_seen, 7);
        let mut all: Vec<usize> = chunks
            .iter()
            .flat_map(|c| c.events().copied())
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_split_credits_overflow_to_first_chunk() {
        // 5 seen, 2 held: the 3 sampled-away offers stay in the totals.
        let events = reservoir_with(2, &[0.1, 0.2, 0.3, 0.4, 0.5]);
        let chunks = events.split_into(1);
        assert_eq!(chunks.len(), 2);
        let total_seen: u64 = chunks.iter().map(|c| c.num_seen()).sum();
        assert_eq!(total_seen, 5);
    }

    #[test]
    fn test_truncate() {
        let mut events = reservoir_with(10, &[0.1, 0.2, 0.3]);
        events.truncate(2);
        assert_eq!(events.num_saved(), 2);
        assert_eq!(events.num_seen(), 3);
    }
}
