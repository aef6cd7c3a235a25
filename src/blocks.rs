//! Block Classifier
//!
//! Groups the surveyed assets by parent key and types each group with an
//! ordered rule list. Search-box assets are taken out before grouping and
//! come back as a single `SearchBlock`, so blocks partition the asset list.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::options::BlockConfidence;
use crate::patterns::HERO_CLASS;
use crate::result::{Asset, AssetKind, Block, BlockType};

/// Asset counts per kind within one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub inputs: usize,
    pub buttons: usize,
    pub images: usize,
    pub icons: usize,
    pub headings: usize,
    pub links: usize,
    pub videos: usize,
}

impl KindCounts {
    fn add(&mut self, kind: AssetKind) {
        match kind {
            AssetKind::Input => self.inputs += 1,
            AssetKind::Button => self.buttons += 1,
            AssetKind::Image => self.images += 1,
            AssetKind::Icon => self.icons += 1,
            AssetKind::Heading => self.headings += 1,
            AssetKind::Link => self.links += 1,
            AssetKind::Video => self.videos += 1,
        }
    }

    fn is_hero_shaped(&self) -> bool {
        self.headings > 0 && self.images > 0 && self.buttons > 0 && self.inputs == 0
    }
}

struct Group<'a> {
    key: &'a str,
    classnames: &'a str,
    assets: Vec<usize>,
    counts: KindCounts,
}

/// Type every asset group.
///
/// `search_assets` are removed from the general partition and returned as one
/// trailing `SearchBlock` when non-empty.
#[must_use]
pub fn classify_blocks(
    assets: &[Asset],
    search_assets: &BTreeSet<usize>,
    confidence: &BlockConfidence,
) -> Vec<Block> {
    let mut order: Vec<Group> = Vec::new();
    let mut by_key: HashMap<&str, usize> = HashMap::new();

    for asset in assets.iter().filter(|a| !search_assets.contains(&a.id)) {
        let slot = *by_key.entry(asset.parent_key.as_str()).or_insert_with(|| {
            order.push(Group {
                key: &asset.parent_key,
                classnames: &asset.classnames,
                assets: Vec::new(),
                counts: KindCounts::default(),
            });
            order.len() - 1
        });
        let group = &mut order[slot];
        group.assets.push(asset.id);
        group.counts.add(asset.kind);
    }

    let mut hero_assigned = false;
    let mut blocks: Vec<Block> = order
        .into_iter()
        .map(|group| {
            let (block_type, reason, conf) = type_group(&group, &mut hero_assigned, confidence);
            Block {
                block_type,
                parent_key: group.key.to_string(),
                assets: group.assets,
                classnames: group.classnames.to_string(),
                detection_reason: reason,
                confidence: conf,
            }
        })
        .collect();

    if !search_assets.is_empty() {
        let first = search_assets.iter().next().and_then(|&id| assets.get(id));
        blocks.push(Block {
            block_type: BlockType::SearchBlock,
            parent_key: first.map(|a| a.parent_key.clone()).unwrap_or_default(),
            assets: search_assets.iter().copied().filter(|&id| id < assets.len()).collect(),
            classnames: first.map(|a| a.classnames.clone()).unwrap_or_default(),
            detection_reason: "assets identified as the page search box".to_string(),
            confidence: confidence.search,
        });
    }

    debug!(blocks = blocks.len(), "blocks classified");
    blocks
}

fn type_group(group: &Group, hero_assigned: &mut bool, confidence: &BlockConfidence) -> (BlockType, String, f64) {
    let c = group.counts;

    if c.is_hero_shaped() && *hero_assigned {
        return (
            BlockType::Generic,
            "hero-shaped group after the first hero".to_string(),
            confidence.generic,
        );
    }

    if c.is_hero_shaped() {
        *hero_assigned = true;
        return if HERO_CLASS.is_match(group.classnames) {
            (
                BlockType::Hero,
                "heading, image and button without inputs; hero classnames".to_string(),
                confidence.hero_named,
            )
        } else {
            (
                BlockType::Hero,
                "heading, image and button without inputs".to_string(),
                confidence.hero,
            )
        };
    }

    if c.images > 2 && c.links > 0 {
        return (
            BlockType::ProductGrid,
            format!("{} images with {} links", c.images, c.links),
            confidence.product_grid,
        );
    }

    if c.inputs > 1 && c.buttons > 0 {
        return (
            BlockType::FormBlock,
            format!("{} inputs with a submit control", c.inputs),
            confidence.form_block,
        );
    }

    if c.buttons > 0 && c.inputs == 0 {
        return (
            BlockType::Cta,
            format!("{} buttons without inputs", c.buttons),
            confidence.cta,
        );
    }

    (BlockType::Generic, "no rule matched".to_string(), confidence.generic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn asset(id: usize, kind: AssetKind, key: &str, classnames: &str) -> Asset {
        Asset {
            id,
            kind,
            tag: String::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            markup: String::new(),
            parent_key: key.to_string(),
            classnames: classnames.to_string(),
        }
    }

    fn assets(spec: &[(AssetKind, &str, &str)]) -> Vec<Asset> {
        spec.iter()
            .enumerate()
            .map(|(i, (kind, key, class))| asset(i, *kind, key, class))
            .collect()
    }

    use AssetKind::{Button, Heading, Image, Input, Link};

    #[test]
    fn test_first_hero_wins_and_later_one_is_generic() {
        let list = assets(&[
            (Heading, "k0", "hero banner"),
            (Image, "k0", "hero banner"),
            (Button, "k0", "hero banner"),
            (Heading, "k1", "promo"),
            (Image, "k1", "promo"),
            (Button, "k1", "promo"),
        ]);
        let blocks = classify_blocks(&list, &BTreeSet::new(), &BlockConfidence::default());
        assert_eq!(blocks[0].block_type, BlockType::Hero);
        assert!((blocks[0].confidence - 0.95).abs() < f64::EPSILON);
        assert_eq!(blocks[1].block_type, BlockType::Generic);
        assert_eq!(blocks.iter().filter(|b| b.block_type == BlockType::Hero).count(), 1);
    }

    #[test]
    fn test_later_hero_with_gallery_is_not_a_grid() {
        let group = |key: &'static str| {
            [
                (Heading, key, "feature"),
                (Image, key, "feature"),
                (Image, key, "feature"),
                (Image, key, "feature"),
                (Button, key, "feature"),
                (Link, key, "feature"),
            ]
        };
        let list = assets(&[group("k0"), group("k1")].concat());
        let blocks = classify_blocks(&list, &BTreeSet::new(), &BlockConfidence::default());
        let types: Vec<BlockType> = blocks.iter().map(|b| b.block_type).collect();
        assert_eq!(types, vec![BlockType::Hero, BlockType::Generic]);
        assert_eq!(blocks[1].detection_reason, "hero-shaped group after the first hero");
    }

    #[test]
    fn test_rule_order() {
        let list = assets(&[
            (Image, "grid", ""),
            (Image, "grid", ""),
            (Image, "grid", ""),
            (Link, "grid", ""),
            (Input, "form", ""),
            (Input, "form", ""),
            (Button, "form", ""),
            (Button, "cta", ""),
            (Link, "root", ""),
        ]);
        let blocks = classify_blocks(&list, &BTreeSet::new(), &BlockConfidence::default());
        let types: Vec<BlockType> = blocks.iter().map(|b| b.block_type).collect();
        assert_eq!(
            types,
            vec![BlockType::ProductGrid, BlockType::FormBlock, BlockType::Cta, BlockType::Generic]
        );
    }

    #[test]
    fn test_search_assets_become_one_trailing_block() {
        let list = assets(&[
            (Heading, "k0", ""),
            (Input, "k1", "search"),
            (Button, "k1", "search"),
            (Link, "k1", "search"),
        ]);
        let search: BTreeSet<usize> = [1, 2].into_iter().collect();
        let blocks = classify_blocks(&list, &search, &BlockConfidence::default());

        let last = blocks.last().map(|b| (b.block_type, b.assets.clone()));
        assert_eq!(last, Some((BlockType::SearchBlock, vec![1, 2])));

        let mut covered: Vec<usize> = blocks.iter().flat_map(|b| b.assets.iter().copied()).collect();
        covered.sort_unstable();
        assert_eq!(covered, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_hero_requires_no_inputs() {
        let list = assets(&[(Heading, "k0", "hero"), (Image, "k0", "hero"), (Button, "k0", "hero"), (Input, "k0", "hero")]);
        let blocks = classify_blocks(&list, &BTreeSet::new(), &BlockConfidence::default());
        assert_ne!(blocks[0].block_type, BlockType::Hero);
    }
}
