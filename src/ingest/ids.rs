use std::collections::HashMap;

use super::chunker::Chunk;

/// Assign one fresh UUID per chunk and group the ids by source tag.
///
/// The returned ids are parallel to the input order. The grouping map is a
/// response artifact for the caller (tag -> ids in encounter order); it is
/// never persisted.
pub fn assign_ids(chunks: &[Chunk]) -> (Vec<String>, HashMap<u64, Vec<String>>) {
    let ids: Vec<String> = chunks
        .iter()
        .map(|_| uuid::Uuid::new_v4().to_string())
        .collect();

    let mut grouping: HashMap<u64, Vec<String>> = HashMap::new();
    for (chunk, id) in chunks.iter().zip(&ids) {
        grouping
            .entry(chunk.metadata.tag)
            .or_default()
            .push(id.clone());
    }

    (ids, grouping)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::ingest::chunker::Chunk;
    use crate::ingest::document::DocumentMetadata;

    fn chunk(tag: u64, ordinal: usize) -> Chunk {
        Chunk {
            content: format!("chunk {}", ordinal),
            metadata: DocumentMetadata {
                source: "s".to_string(),
                category: "c".to_string(),
                tag,
            },
            start_offset: ordinal * 10,
            ordinal,
        }
    }

    #[test]
    fn one_unique_id_per_chunk() {
        let chunks = vec![chunk(1, 0), chunk(1, 1), chunk(2, 2)];
        let (ids, _) = assign_ids(&chunks);

        assert_eq!(ids.len(), chunks.len());
        let distinct: HashSet<&String> = ids.iter().collect();
        assert_eq!(distinct.len(), ids.len());
    }

    #[test]
    fn grouping_partitions_by_tag_in_input_order() {
        let chunks = vec![chunk(1, 0), chunk(2, 1), chunk(1, 2), chunk(1, 3)];
        let (ids, grouping) = assign_ids(&chunks);

        assert_eq!(grouping.len(), 2);
        assert_eq!(grouping[&1], vec![ids[0].clone(), ids[2].clone(), ids[3].clone()]);
        assert_eq!(grouping[&2], vec![ids[1].clone()]);
    }

    #[test]
    fn ids_are_fresh_per_call_but_shape_is_stable() {
        let chunks = vec![chunk(5, 0), chunk(5, 1)];
        let (first_ids, first_map) = assign_ids(&chunks);
        let (second_ids, second_map) = assign_ids(&chunks);

        assert_ne!(first_ids, second_ids);
        assert_eq!(first_map.len(), second_map.len());
        assert_eq!(first_map[&5].len(), second_map[&5].len());
    }

    #[test]
    fn empty_input_yields_empty_outputs() {
        let (ids, grouping) = assign_ids(&[]);
        assert!(ids.is_empty());
        assert!(grouping.is_empty());
    }
}
