//! Packs a post's tag set into the single `posts.tags` INTEGER column.
//!
//! Bit `k` of the mask is set when the tag with id `k` is attached. SQLite
//! integers are signed 64-bit, so ids are limited to `0..=MAX_TAG_ID` and the
//! sign bit is never used.

use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use crate::models::Tag;

/// Highest tag id that can be represented in a mask.
pub const MAX_TAG_ID: i64 = 62;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TagCodecError {
    #[error("Tag id {0} cannot be stored in a tag mask (allowed range is 0..={max})", max = MAX_TAG_ID)]
    IdOutOfRange(i64),
}

pub fn is_representable(id: i64) -> bool {
    (0..=MAX_TAG_ID).contains(&id)
}

/// Builds the mask for `tag_ids`, silently dropping ids missing from `valid_tag_ids`.
pub fn encode<'a, I>(tag_ids: I, valid_tag_ids: &HashSet<i64>) -> Result<i64, TagCodecError>
where
    I: IntoIterator<Item = &'a i64>,
{
    let mut mask = 0i64;
    for &id in tag_ids.into_iter().filter(|id| valid_tag_ids.contains(id)) {
        if !is_representable(id) {
            return Err(TagCodecError::IdOutOfRange(id));
        }
        mask |= 1i64 << id;
    }
    Ok(mask)
}

/// Returns the ids of the known tags whose bit is set. Bits without a matching tag are ignored.
pub fn decode(mask: i64, all_tags: &[Tag]) -> BTreeSet<i64> {
    all_tags
        .iter()
        .map(|tag| tag.id)
        .filter(|&id| is_representable(id) && mask & (1i64 << id) != 0)
        .collect()
}

/// Same as [`decode`] but hands back the tags themselves, in table order.
pub fn decode_tags(mask: i64, all_tags: &[Tag]) -> Vec<Tag> {
    let ids = decode(mask, all_tags);
    all_tags.iter().filter(|tag| ids.contains(&tag.id)).cloned().collect()
}

/// The single bit owned by `id`, used to clear a deleted tag from every post.
pub fn bit_for(id: i64) -> Result<i64, TagCodecError> {
    if !is_representable(id) {
        return Err(TagCodecError::IdOutOfRange(id));
    }
    Ok(1i64 << id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: i64, name: &str) -> Tag {
        Tag { id, name: name.to_string() }
    }

    fn sample_tags() -> Vec<Tag> {
        vec![tag(0, "Math"), tag(1, "Science"), tag(2, "Art")]
    }

    fn ids(tags: &[Tag]) -> HashSet<i64> {
        tags.iter().map(|t| t.id).collect()
    }

    #[test]
    fn encodes_math_and_art_as_five() {
        let tags = sample_tags();
        let mask = encode(&[0, 2], &ids(&tags)).unwrap();
        assert_eq!(mask, 5);
        assert_eq!(decode(5, &tags), BTreeSet::from([0, 2]));
    }

    #[test]
    fn deleting_an_unset_tag_does_not_change_decoding() {
        let mut tags = sample_tags();
        tags.retain(|t| t.id != 1);
        assert_eq!(decode(5, &tags), BTreeSet::from([0, 2]));
    }

    #[test]
    fn empty_inputs() {
        let tags = sample_tags();
        assert_eq!(encode(&[], &ids(&tags)).unwrap(), 0);
        assert!(decode(0, &tags).is_empty());
    }

    #[test]
    fn unknown_ids_are_dropped() {
        let tags = sample_tags();
        assert_eq!(encode(&[7], &ids(&tags)).unwrap(), 0);
        assert_eq!(encode(&[99], &ids(&tags)).unwrap(), 0);
        assert_eq!(encode(&[-3], &ids(&tags)).unwrap(), 0);
        assert_eq!(encode(&[1, 7], &ids(&tags)).unwrap(), 2);
    }

    #[test]
    fn round_trip_is_intersection_with_valid_ids() {
        let tags: Vec<Tag> = (0..=MAX_TAG_ID).step_by(3).map(|id| tag(id, &format!("t{id}"))).collect();
        let valid = ids(&tags);
        let requested: Vec<i64> = (0..=MAX_TAG_ID).filter(|id| id % 2 == 0).collect();

        let mask = encode(&requested, &valid).unwrap();
        let expected: BTreeSet<i64> = requested.iter().copied().filter(|id| valid.contains(id)).collect();
        assert_eq!(decode(mask, &tags), expected);
    }

    #[test]
    fn highest_id_uses_bit_62() {
        let tags = vec![tag(MAX_TAG_ID, "last")];
        let mask = encode(&[MAX_TAG_ID], &ids(&tags)).unwrap();
        assert!(mask > 0);
        assert_eq!(decode(mask, &tags), BTreeSet::from([MAX_TAG_ID]));
    }

    #[test]
    fn valid_but_unrepresentable_id_is_rejected() {
        let tags = vec![tag(63, "overflow")];
        assert_eq!(encode(&[63], &ids(&tags)), Err(TagCodecError::IdOutOfRange(63)));
        assert!(bit_for(63).is_err());
        assert_eq!(bit_for(4).unwrap(), 16);
    }

    #[test]
    fn stale_bits_are_ignored() {
        let tags = sample_tags();
        let mask = (1 << 2) | (1 << 10);
        assert_eq!(decode_tags(mask, &tags), vec![tag(2, "Art")]);
    }
}
