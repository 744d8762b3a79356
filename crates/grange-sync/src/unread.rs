use grange_types::models::UnreadMarker;

/// Unread count for one thread: markers under `chat-{group}-{thread}-`.
pub fn thread_unread_count(markers: &[UnreadMarker], group_id: u64, thread_id: u64) -> usize {
    markers.iter().filter(|m| m.in_thread(group_id, thread_id)).count()
}

/// Unread count for a whole group (question conversations roll up to the
/// group): markers under `chat-{group}-`.
pub fn group_unread_count(markers: &[UnreadMarker], group_id: u64) -> usize {
    markers.iter().filter(|m| m.in_group(group_id)).count()
}

/// The markers a read acknowledgement for this thread must delete.
pub fn markers_for_thread(
    markers: &[UnreadMarker],
    group_id: u64,
    thread_id: u64,
) -> Vec<UnreadMarker> {
    markers
        .iter()
        .filter(|m| m.in_thread(group_id, thread_id))
        .cloned()
        .collect()
}
