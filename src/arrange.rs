//! Re-parenthesizes compounds so joins follow rule-application time.
//!
//! The joiner with the latest era becomes the root, and so on downward. The
//! reading order of leaves never changes.
use crate::lexicon::domain::{Compound, Joiner, Morpheme, ResolvedForm};
use crate::rules::Rules;

struct Link {
    depth: usize,
    joiner: Joiner,
    leaf: Morpheme,
}

/// Rebuild `form` so that every joiner's era ranks at least as high as every
/// joiner below it. Ties keep the shallower original joiner on top, then the
/// leftmost one.
pub fn arrange(form: &ResolvedForm, rules: &Rules) -> ResolvedForm {
    let mut links = Vec::new();
    let head = flatten(form, 0, &mut links);
    rebuild(head, &links, rules)
}

/// Returns the leftmost leaf and appends one link per joiner, each holding
/// the leaf immediately to its right.
fn flatten(form: &ResolvedForm, depth: usize, links: &mut Vec<Link>) -> Morpheme {
    match form {
        Compound::Component(leaf) => leaf.clone(),
        Compound::Joined { head, joiner, tail } => {
            let first = flatten(head, depth + 1, links);
            let index = links.len();
            let right = flatten(tail, depth + 1, links);
            links.insert(
                index,
                Link {
                    depth,
                    joiner: joiner.clone(),
                    leaf: right,
                },
            );
            first
        }
    }
}

fn rebuild(head: Morpheme, links: &[Link], rules: &Rules) -> ResolvedForm {
    let Some(root) = pick_root(links, rules) else {
        return Compound::Component(head);
    };
    let left = rebuild(head, &links[..root], rules);
    let link = &links[root];
    let right = rebuild(link.leaf.clone(), &links[root + 1..], rules);
    Compound::join(left, link.joiner.clone(), right)
}

fn pick_root(links: &[Link], rules: &Rules) -> Option<usize> {
    let mut best: Option<(usize, usize, usize)> = None;
    for (index, link) in links.iter().enumerate() {
        let rank = rules.rank(link.joiner.era.as_ref());
        let better = match best {
            None => true,
            Some((_, best_rank, best_depth)) => {
                rank > best_rank || (rank == best_rank && link.depth < best_depth)
            }
        };
        if better {
            best = Some((index, rank, link.depth));
        }
    }
    best.map(|(index, _, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Rules {
        Rules::parse("palatalization:\nera1:\nintervocalic-voicing:\nera2:\n")
    }

    fn leaf(form: &str) -> ResolvedForm {
        Compound::Component(Morpheme::new(form))
    }

    fn max_rank(form: &ResolvedForm, rules: &Rules) -> usize {
        match form {
            Compound::Component(_) => 0,
            Compound::Joined { head, joiner, tail } => rules
                .rank(joiner.era.as_ref())
                .max(max_rank(head, rules))
                .max(max_rank(tail, rules)),
        }
    }

    fn assert_monotone(form: &ResolvedForm, rules: &Rules) {
        if let Compound::Joined { head, joiner, tail } = form {
            let rank = rules.rank(joiner.era.as_ref());
            assert!(rank >= max_rank(head, rules), "{form}");
            assert!(rank >= max_rank(tail, rules), "{form}");
            assert_monotone(head, rules);
            assert_monotone(tail, rules);
        }
    }

    #[test]
    fn already_ordered_forms_are_unchanged() {
        let form = Compound::join(leaf("apak"), Joiner::head().at("era1"), leaf("iki"));
        assert_eq!(arrange(&form, &rules()), form);
    }

    #[test]
    fn later_outer_suffix_stays_on_top() {
        // (apak +@era1 iki) +@era2 ta
        let inner = Compound::join(leaf("apak"), Joiner::head().at("era1"), leaf("iki"));
        let form = Compound::join(inner, Joiner::head().at("era2"), leaf("ta"));
        assert_eq!(arrange(&form, &rules()), form);
    }

    #[test]
    fn later_inner_join_is_hoisted() {
        // apak +@era1 (iki +@era2 ta) becomes (apak +@era1 iki) +@era2 ta
        let inner = Compound::join(leaf("iki"), Joiner::head().at("era2"), leaf("ta"));
        let form = Compound::join(leaf("apak"), Joiner::head().at("era1"), inner);
        let expected = Compound::join(
            Compound::join(leaf("apak"), Joiner::head().at("era1"), leaf("iki")),
            Joiner::head().at("era2"),
            leaf("ta"),
        );
        let arranged = arrange(&form, &rules());
        assert_eq!(arranged, expected);
        assert_monotone(&arranged, &rules());
    }

    #[test]
    fn ties_keep_the_shallower_joiner_on_top() {
        // "a !+ b" +! "c !+ d": all eras equal, the outer joiner stays the root.
        let form = Compound::join(
            Compound::join(leaf("a"), Joiner::head(), leaf("b")),
            Joiner::tail(),
            Compound::join(leaf("c"), Joiner::head(), leaf("d")),
        );
        assert_eq!(arrange(&form, &rules()), form);
    }

    #[test]
    fn leaves_keep_reading_order() {
        let form = Compound::join(
            Compound::join(leaf("a"), Joiner::tail().at("era2"), leaf("b")),
            Joiner::head(),
            Compound::join(leaf("c"), Joiner::head().at("era1"), leaf("d")),
        );
        let arranged = arrange(&form, &rules());
        let forms: Vec<&str> = arranged
            .leaves()
            .into_iter()
            .map(|leaf| leaf.form.as_str())
            .collect();
        assert_eq!(forms, ["a", "b", "c", "d"]);
        assert_monotone(&arranged, &rules());
        let Compound::Joined { joiner, .. } = &arranged else {
            panic!("expected a join");
        };
        assert_eq!(joiner, &Joiner::tail().at("era2"));
    }
}
