use super::domain::{Compound, Joiner, Morpheme, Stress};
use super::parse::{parse_records, parse_sentence, parse_word};
use super::*;

fn lexicon(text: &str) -> Lexicon {
    Lexicon::from_records(parse_records(text, None).expect("parse")).expect("lexicon")
}

fn leaf(form: &str) -> ResolvedForm {
    Compound::Component(Morpheme::new(form))
}

fn root() -> Scope {
    Scope::default()
}

const STONE: &str = "\
entry <stone> *apak (n.) a stone
entry &plural <water> *ume (n.) water
affix .PL *iki@era1 plural
affix !.AUG *ta augmentative
affix NEG. *na negation
affix !INT. *so intensive
template &plural $ $.PL
";

#[test]
fn suffix_with_era_resolves_to_era_join() {
    let lexicon = lexicon(STONE).with_rules(Rules::parse("palatalization:\nera1:\n"));
    let form = lexicon
        .resolve(&parse_word("<stone>.PL").expect("word"), &root())
        .expect("resolve");
    assert_eq!(
        form,
        Compound::join(leaf("apak"), Joiner::head().at("era1"), leaf("iki"))
    );
}

#[test]
fn affix_stress_flag_picks_the_stressed_side() {
    let lexicon = lexicon(STONE);
    let resolve = |text: &str| {
        lexicon
            .resolve(&parse_word(text).expect("word"), &root())
            .expect("resolve")
    };
    let Compound::Joined { joiner, .. } = resolve("<stone>.AUG") else {
        panic!("expected join");
    };
    assert_eq!(joiner.stress, Stress::Tail);
    let Compound::Joined { joiner, .. } = resolve("NEG.<stone>") else {
        panic!("expected join");
    };
    assert_eq!(joiner.stress, Stress::Tail);
    let Compound::Joined { joiner, head, .. } = resolve("INT.<stone>") else {
        panic!("expected join");
    };
    assert_eq!(joiner.stress, Stress::Head);
    assert_eq!(*head, leaf("so"));
}

#[test]
fn suffixes_bind_before_prefixes() {
    let lexicon = lexicon(STONE);
    let form = lexicon
        .resolve(&parse_word("NEG.<stone>.AUG").expect("word"), &root())
        .expect("resolve");
    let expected = Compound::join(
        leaf("na"),
        Joiner::tail(),
        Compound::join(leaf("apak"), Joiner::tail(), leaf("ta")),
    );
    assert_eq!(form, expected);
}

#[test]
fn missing_names_are_reported() {
    let lexicon = lexicon(STONE);
    let err = lexicon
        .resolve(&parse_word("<rock>").expect("word"), &root())
        .expect_err("missing lexeme");
    assert!(matches!(err, Error::MissingLexeme { name, .. } if name == "rock"));
    let err = lexicon
        .resolve(&parse_word("<stone>.DU").expect("word"), &root())
        .expect_err("missing affix");
    assert!(matches!(err, Error::MissingAffix { .. }));
    assert!(matches!(
        lexicon.get_vars(Some("dual")),
        Err(Error::MissingTemplate(name)) if name == "dual"
    ));
}

#[test]
fn self_reference_is_cyclic() {
    let lexicon = lexicon(
        "entry <a> <b>.PL (n.) a\nentry <b> <a> (n.) b\naffix .PL *i plural\naffix .X <c>.X loop\nentry <c> *c (n.) c\n",
    );
    let err = lexicon
        .resolve(&parse_word("<a>").expect("word"), &root())
        .expect_err("cycle");
    assert!(matches!(err, Error::CyclicDefinition(_)));
    assert_eq!(err.to_string(), "cyclic definition through <a>");
    let err = lexicon
        .resolve(&parse_word("<c>.X").expect("word"), &root())
        .expect_err("affix cycle");
    assert!(matches!(err, Error::CyclicDefinition(_)));
    assert_eq!(err.to_string(), "cyclic definition through .X");
}

#[test]
fn repeated_lexeme_is_not_a_cycle() {
    let lexicon = lexicon(STONE);
    let form = lexicon
        .resolve(&parse_word("<stone> !+ <stone>").expect("word"), &root())
        .expect("resolve");
    assert_eq!(form.leaves().len(), 2);
}

#[test]
fn var_affix_applies_to_its_single_source() {
    let lexicon = lexicon(
        "entry <two> *du (num.) two\naffix .PL *i plural\naffix .DU $.PL (<two>) dual\naffix .BAD $.PL (<two> <two>) broken\n",
    );
    let form = lexicon
        .resolve(&parse_word("<two>.DU").expect("word"), &root())
        .expect("resolve");
    let dual = Compound::join(leaf("du"), Joiner::head(), leaf("i"));
    assert_eq!(form, Compound::join(leaf("du"), Joiner::head(), dual));

    let err = lexicon
        .resolve(&parse_word("<two>.BAD").expect("word"), &root())
        .expect_err("two sources");
    assert!(matches!(err, Error::MissingVar { sources: 2, .. }));
}

#[test]
fn formless_affix_folds_its_sources() {
    let lexicon = lexicon(
        "entry <one> *u (num.) one\nentry <two> *du (num.) two\nentry <x> *x (n.) x\naffix .SUM (<one> <two> <one>) sum\naffix .NONE nothing\n",
    );
    let form = lexicon
        .resolve(&parse_word("<x>.SUM").expect("word"), &root())
        .expect("resolve");
    let sum = Compound::join(
        Compound::join(leaf("u"), Joiner::head(), leaf("du")),
        Joiner::head(),
        leaf("u"),
    );
    assert_eq!(form, Compound::join(leaf("x"), Joiner::head(), sum));

    let err = lexicon
        .resolve(&parse_word("<x>.NONE").expect("word"), &root())
        .expect_err("no form");
    assert!(matches!(err, Error::AffixDefinitionMissingForm(_)));
}

#[test]
fn eras_outside_the_rule_file_are_rejected() {
    let lexicon = lexicon(STONE).with_rules(Rules::parse("era2:\n"));
    let err = lexicon
        .resolve(&parse_word("<stone>.PL").expect("word"), &root())
        .expect_err("unknown era");
    assert!(matches!(err, Error::UnknownRule(rule) if rule == "era1"));
    let err = lexicon
        .resolve(&parse_word("*apak@era9").expect("word"), &root())
        .expect_err("unknown era");
    assert!(matches!(err, Error::UnknownRule(_)));
}

#[test]
fn duplicate_definitions_fail_to_load() {
    let records = parse_records("entry <a> *a (n.) a\nentry <a> *b (n.) b\n", None).expect("parse");
    assert!(matches!(
        Lexicon::from_records(records),
        Err(Error::DuplicateDefinition { kind: "lexeme", .. })
    ));
    let records =
        parse_records("entry <a> *a (n.) a\nentry {scope:old} <a> *b (n.) b\n", None).expect("parse");
    assert!(Lexicon::from_records(records).is_ok());
}

#[test]
fn templates_expand_into_inflections() {
    let lexicon = lexicon(STONE);
    assert_eq!(lexicon.get_vars(None).expect("vars"), vec![Var::default()]);
    let (scope, water) = lexicon
        .entries()
        .find(|(_, entry)| entry.lexeme.name == "water")
        .expect("water");
    let inflections = lexicon.inflections(water, scope).expect("inflections");
    assert_eq!(inflections.len(), 2);
    assert_eq!(inflections[0].1, leaf("ume"));
    assert_eq!(
        inflections[1].1,
        Compound::join(leaf("ume"), Joiner::head().at("era1"), leaf("iki"))
    );
}

#[test]
fn substitute_wraps_any_word() {
    let lexicon = lexicon(STONE);
    let var = parse::parse_var("NEG.$.PL").expect("var");
    let form = lexicon
        .substitute(&var, &parse_word("*ka").expect("word"), &root())
        .expect("substitute");
    assert_eq!(
        form,
        Compound::join(
            leaf("na"),
            Joiner::tail(),
            Compound::join(leaf("ka"), Joiner::head().at("era1"), leaf("iki")),
        )
    );
}

#[test]
fn lookup_describes_each_name_once() {
    let lexicon = lexicon(STONE);
    let found = lexicon
        .lookup(
            &parse_word("NEG.<stone>.PL !+ *ka !+ <stone>").expect("word"),
            &root(),
        )
        .expect("lookup");
    let described: Vec<(String, &str)> = found
        .iter()
        .map(|(item, description)| (item.to_string(), description.as_str()))
        .collect();
    assert_eq!(
        described,
        vec![
            ("NEG.".to_string(), "negation"),
            ("<stone>".to_string(), "(n.) a stone"),
            (".PL".to_string(), "plural"),
            ("*ka".to_string(), "ka"),
        ]
    );
}

#[test]
fn loading_follows_includes_and_language_scopes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root_path = dir.path().join("lexicon.pycl");
    fs::create_dir_all(dir.path().join("lang")).expect("mkdir");
    fs::write(
        &root_path,
        "include \"lang/shared.pycl\"\nlang %young : %old lang/young.pycl\nentry {scope:old} <stone> *apak (n.) old stone\n",
    )
    .expect("write root");
    fs::write(
        dir.path().join("lang/shared.pycl"),
        "entry <water> *ume (n.) water\naffix .PL *iki plural\n",
    )
    .expect("write shared");
    fs::write(
        dir.path().join("lang/young.pycl"),
        "entry <fire> <stone>.PL (n.) fire\n",
    )
    .expect("write young");

    let lexicon = Lexicon::load(&root_path).expect("load");
    assert_eq!(lexicon.sources().len(), 3);

    let young = Scope::new("young");
    let form = lexicon
        .resolve(&parse_word("<fire> !+ <water>").expect("word"), &young)
        .expect("resolve through parent and root");
    let forms: Vec<&str> = form.leaves().iter().map(|leaf| leaf.form.as_str()).collect();
    assert_eq!(forms, ["apak", "iki", "ume"]);

    assert!(matches!(
        lexicon.resolve(&parse_word("<fire>").expect("word"), &root()),
        Err(Error::MissingLexeme { .. })
    ));
    let scoped = lexicon
        .resolve(&parse_word("<fire>%young").expect("word"), &root())
        .expect("explicit scope");
    assert_eq!(scoped.leaves().len(), 2);
}

#[test]
fn include_cycles_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.pycl"), "include \"b.pycl\"\n").expect("write a");
    fs::write(dir.path().join("b.pycl"), "include \"a.pycl\"\n").expect("write b");
    let err = Lexicon::load(&dir.path().join("a.pycl")).expect_err("cycle");
    assert!(matches!(err, Error::CyclicDefinition(_)));
    let message = err.to_string();
    assert!(message.ends_with("a.pycl"), "{message}");
    assert!(!message.contains('<'), "{message}");
}

#[test]
fn sentence_scope_overrides_default() {
    let lexicon = lexicon("entry <a> *root (n.) a\nentry {scope:old} <a> *old (n.) a\n");
    let sentence = parse_sentence("{scope:old} <a> <a>").expect("sentence");
    let forms = lexicon.resolve_sentence(&sentence, &root()).expect("resolve");
    assert_eq!(forms, vec![leaf("old"), leaf("old")]);
    let plain = parse_sentence("<a>").expect("sentence");
    assert_eq!(
        lexicon.resolve_sentence(&plain, &root()).expect("resolve"),
        vec![leaf("root")]
    );
}
