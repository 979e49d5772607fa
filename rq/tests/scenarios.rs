//! The literal end-to-end scenarios and a sample of the universal testable
//! properties (determinism, stable sort, CONSTRUCT soundness, round-trip).
//! Every query here is an algebra tree built by hand rather than parsed text
//! — no SPARQL surface parser is part of this workspace (§0's scope cut);
//! callers are expected to construct or receive an algebra tree, exactly as
//! these tests do.
use std::collections::HashSet;
use std::rc::Rc;
use std::str::FromStr;

use rq::{DateTime, GraphPattern, MemoryTripleSource, NamedNode, NamedOrVariable, QueryEvaluator, Term, TermOrVariable, TriplePattern, VariableOffset, VariablesTable};
use rq_model::{Literal, VariableKind};

fn now() -> DateTime {
    DateTime::from_str("2024-06-01T00:00:00Z").unwrap()
}

fn n(iri: &str) -> NamedNode {
    NamedNode::new_unchecked(iri)
}

fn var(s: VariableOffset) -> NamedOrVariable {
    NamedOrVariable::Variable(s)
}

fn term(t: impl Into<Term>) -> TermOrVariable {
    TermOrVariable::Term(t.into())
}

fn var_term(v: VariableOffset) -> TermOrVariable {
    TermOrVariable::Variable(v)
}

fn project(inner: GraphPattern, variables: Vec<VariableOffset>) -> GraphPattern {
    GraphPattern::Project { inner: Box::new(inner), variables }
}

fn bgp(patterns: Vec<TriplePattern>) -> GraphPattern {
    GraphPattern::Bgp { patterns }
}

fn collect_rows(evaluator: &QueryEvaluator, pattern: &GraphPattern, source: Rc<MemoryTripleSource>, variables: VariablesTable) -> Vec<Vec<Option<Term>>> {
    let results = evaluator.execute_select(pattern, source, variables, now()).unwrap();
    results.map(|r| r.unwrap().values().to_vec()).collect()
}

/// S1: basic BGP, exact match.
#[test]
fn s1_basic_bgp_exact_match() {
    let mut table = VariablesTable::new();
    let s = table.add("s", VariableKind::Normal);
    let p = table.add("p", VariableKind::Normal);
    let o = table.add("o", VariableKind::Normal);
    let mut store = MemoryTripleSource::new();
    store.insert(n("urn:s"), n("urn:p"), Term::Literal(Literal::new_simple("o")));
    let pattern = project(bgp(vec![TriplePattern::new(var(s), var(p), var_term(o))]), vec![s, p, o]);

    let rows = collect_rows(&QueryEvaluator::new(), &pattern, Rc::new(store), table);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], vec![Some(Term::NamedNode(n("urn:s"))), Some(Term::NamedNode(n("urn:p"))), Some(Term::Literal(Literal::new_simple("o")))]);
}

/// S2: shared-variable join across two patterns inside one BGP.
#[test]
fn s2_shared_variable_join() {
    let mut table = VariablesTable::new();
    let p = table.add("p", VariableKind::Normal);
    let name = table.add("n", VariableKind::Normal);
    let likes = table.add("d", VariableKind::Normal);
    let name_pred = n("urn:name");
    let likes_pred = n("urn:likes");
    let mut store = MemoryTripleSource::new();
    store
        .insert(n("urn:a"), name_pred.clone(), Term::Literal(Literal::new_simple("Alice")))
        .insert(n("urn:a"), likes_pred.clone(), Term::NamedNode(n("urn:coffee")))
        .insert(n("urn:b"), name_pred.clone(), Term::Literal(Literal::new_simple("Bob")))
        .insert(n("urn:b"), likes_pred.clone(), Term::NamedNode(n("urn:tea")))
        .insert(n("urn:c"), name_pred.clone(), Term::Literal(Literal::new_simple("Carol")))
        .insert(n("urn:c"), likes_pred.clone(), Term::NamedNode(n("urn:coffee")));
    let pattern = project(
        bgp(vec![TriplePattern::new(var(p), NamedOrVariable::Term(name_pred.into()), var_term(name)), TriplePattern::new(var(p), NamedOrVariable::Term(likes_pred.into()), var_term(likes))]),
        vec![p, name, likes],
    );

    let rows: HashSet<Vec<Option<Term>>> = collect_rows(&QueryEvaluator::new(), &pattern, Rc::new(store), table).into_iter().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.contains(&vec![Some(Term::NamedNode(n("urn:a"))), Some(Term::Literal(Literal::new_simple("Alice"))), Some(Term::NamedNode(n("urn:coffee")))]));
    assert!(rows.contains(&vec![Some(Term::NamedNode(n("urn:b"))), Some(Term::Literal(Literal::new_simple("Bob"))), Some(Term::NamedNode(n("urn:tea")))]));
    assert!(rows.contains(&vec![Some(Term::NamedNode(n("urn:c"))), Some(Term::Literal(Literal::new_simple("Carol"))), Some(Term::NamedNode(n("urn:coffee")))]));
}

/// S3: UNION whose two branches bind `?v` to the same variable offset from
/// different triple positions.
#[test]
fn s3_union_with_column_union() {
    let mut table = VariablesTable::new();
    let s = table.add("s", VariableKind::Normal);
    let v = table.add("v", VariableKind::Normal);
    let x = n("urn:x");
    let y = n("urn:y");
    let one = Term::Literal(Literal::new_typed("1", NamedNode::new_unchecked(rq_model::vocab::xsd::INTEGER)));
    let two = Term::Literal(Literal::new_typed("2", NamedNode::new_unchecked(rq_model::vocab::xsd::INTEGER)));
    let mut store = MemoryTripleSource::new();
    store.insert(n("urn:a"), x.clone(), one.clone()).insert(n("urn:b"), y.clone(), two.clone());
    let pattern = project(
        GraphPattern::Union {
            left: Box::new(bgp(vec![TriplePattern::new(var(s), NamedOrVariable::Term(x.into()), var_term(v))])),
            right: Box::new(bgp(vec![TriplePattern::new(var(s), NamedOrVariable::Term(y.into()), var_term(v))])),
        },
        vec![s, v],
    );

    let rows: HashSet<Vec<Option<Term>>> = collect_rows(&QueryEvaluator::new(), &pattern, Rc::new(store), table).into_iter().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.contains(&vec![Some(Term::NamedNode(n("urn:a"))), Some(one)]));
    assert!(rows.contains(&vec![Some(Term::NamedNode(n("urn:b"))), Some(two)]));
}

/// S4: OPTIONAL leaves `?g` unbound when the inner pattern has no match.
#[test]
fn s4_optional() {
    let mut table = VariablesTable::new();
    let p = table.add("p", VariableKind::Normal);
    let name = table.add("n", VariableKind::Normal);
    let age = table.add("g", VariableKind::Normal);
    let name_pred = n("urn:name");
    let age_pred = n("urn:age");
    let thirty = Term::Literal(Literal::new_typed("30", NamedNode::new_unchecked(rq_model::vocab::xsd::INTEGER)));
    let mut store = MemoryTripleSource::new();
    store
        .insert(n("urn:a"), name_pred.clone(), Term::Literal(Literal::new_simple("Alice")))
        .insert(n("urn:a"), age_pred.clone(), thirty.clone())
        .insert(n("urn:b"), name_pred.clone(), Term::Literal(Literal::new_simple("Bob")));
    let pattern = project(
        GraphPattern::LeftJoin {
            left: Box::new(bgp(vec![TriplePattern::new(var(p), NamedOrVariable::Term(name_pred.into()), var_term(name))])),
            right: Box::new(bgp(vec![TriplePattern::new(var(p), NamedOrVariable::Term(age_pred.into()), var_term(age))])),
            filter: None,
        },
        vec![name, age],
    );

    let rows: HashSet<Vec<Option<Term>>> = collect_rows(&QueryEvaluator::new(), &pattern, Rc::new(store), table).into_iter().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.contains(&vec![Some(Term::Literal(Literal::new_simple("Alice"))), Some(thirty)]));
    assert!(rows.contains(&vec![Some(Term::Literal(Literal::new_simple("Bob"))), None]));
}

/// S5: FILTER over an OPTIONAL's unbound variable evaluates to an error
/// value, rejecting the row rather than propagating a host-language error.
#[test]
fn s5_filter_with_unbound() {
    let mut table = VariablesTable::new();
    let p = table.add("p", VariableKind::Normal);
    let name = table.add("n", VariableKind::Normal);
    let age = table.add("g", VariableKind::Normal);
    let name_pred = n("urn:name");
    let age_pred = n("urn:age");
    let thirty = Term::Literal(Literal::new_typed("30", NamedNode::new_unchecked(rq_model::vocab::xsd::INTEGER)));
    let mut store = MemoryTripleSource::new();
    store
        .insert(n("urn:a"), name_pred.clone(), Term::Literal(Literal::new_simple("Alice")))
        .insert(n("urn:a"), age_pred.clone(), thirty)
        .insert(n("urn:b"), name_pred.clone(), Term::Literal(Literal::new_simple("Bob")));
    let threshold = rq::Expression::Literal(Literal::new_typed("25", NamedNode::new_unchecked(rq_model::vocab::xsd::INTEGER)));
    let pattern = project(
        GraphPattern::Filter {
            expr: rq::Expression::Greater(Box::new(rq::Expression::Variable(age)), Box::new(threshold)),
            inner: Box::new(GraphPattern::LeftJoin {
                left: Box::new(bgp(vec![TriplePattern::new(var(p), NamedOrVariable::Term(name_pred.into()), var_term(name))])),
                right: Box::new(bgp(vec![TriplePattern::new(var(p), NamedOrVariable::Term(age_pred.into()), var_term(age))])),
                filter: None,
            }),
        },
        vec![name],
    );

    let rows = collect_rows(&QueryEvaluator::new(), &pattern, Rc::new(store), table);
    assert_eq!(rows, vec![vec![Some(Term::Literal(Literal::new_simple("Alice")))]]);
}

/// S6: MINUS drops rows whose LHS bindings have a compatible RHS match.
#[test]
fn s6_minus_with_correlation() {
    let mut table = VariablesTable::new();
    let s = table.add("s", VariableKind::Normal);
    let v = table.add("v", VariableKind::Normal);
    let w = table.add("w", VariableKind::Normal);
    let x = n("urn:x");
    let y = n("urn:y");
    let mut store = MemoryTripleSource::new();
    store
        .insert(n("urn:a"), x.clone(), term_int(1))
        .insert(n("urn:b"), x.clone(), term_int(2))
        .insert(n("urn:a"), y.clone(), term_int(10));
    let pattern = project(
        GraphPattern::Diff {
            left: Box::new(bgp(vec![TriplePattern::new(var(s), NamedOrVariable::Term(x.into()), var_term(v))])),
            right: Box::new(bgp(vec![TriplePattern::new(var(s), NamedOrVariable::Term(y.into()), var_term(w))])),
        },
        vec![s],
    );

    let rows = collect_rows(&QueryEvaluator::new(), &pattern, Rc::new(store), table);
    assert_eq!(rows, vec![vec![Some(Term::NamedNode(n("urn:b")))]]);
}

fn term_int(value: i64) -> Term {
    Term::Literal(Literal::new_typed(value.to_string(), NamedNode::new_unchecked(rq_model::vocab::xsd::INTEGER)))
}

/// Property 1: determinism. Re-running the same query against the same
/// source and seed produces byte-identical bindings in iteration order.
#[test]
fn determinism_same_seed_same_results() {
    let build = || {
        let mut table = VariablesTable::new();
        let s = table.add("s", VariableKind::Normal);
        let p = table.add("p", VariableKind::Normal);
        let mut store = MemoryTripleSource::new();
        for i in 0..20 {
            store.insert(NamedNode::new_unchecked(format!("urn:s{i}")), n("urn:p"), term_int(i));
        }
        (project(bgp(vec![TriplePattern::new(var(s), var(p), var_term(p))]), vec![s]), store, table)
    };
    let (pattern, store, table) = build();
    let evaluator = QueryEvaluator::new().with_rand_seed(7);
    let first = collect_rows(&evaluator, &pattern, Rc::new(store), table);

    let (pattern, store, table) = build();
    let second = collect_rows(&evaluator, &pattern, Rc::new(store), table);
    assert_eq!(first, second);
}

/// Property 9: CONSTRUCT soundness — a template whose subject resolves to
/// unbound is dropped instead of producing a malformed triple.
#[test]
fn construct_drops_triples_with_unbound_subject() {
    let mut table = VariablesTable::new();
    let p = table.add("p", VariableKind::Normal);
    let name = table.add("n", VariableKind::Normal);
    let age = table.add("g", VariableKind::Normal);
    let name_pred = n("urn:name");
    let age_pred = n("urn:age");
    let mut store = MemoryTripleSource::new();
    store.insert(n("urn:a"), name_pred.clone(), Term::Literal(Literal::new_simple("Alice")));
    let pattern = GraphPattern::LeftJoin {
        left: Box::new(bgp(vec![TriplePattern::new(var(p), NamedOrVariable::Term(name_pred.into()), var_term(name))])),
        right: Box::new(bgp(vec![TriplePattern::new(var(p), NamedOrVariable::Term(age_pred.into()), var_term(age))])),
        filter: None,
    };
    let templates = vec![TriplePattern::new(NamedOrVariable::Variable(age), NamedOrVariable::Term(n("urn:has-age").into()), term(Term::Literal(Literal::new_simple("irrelevant"))))];

    let evaluator = QueryEvaluator::new();
    let graph = evaluator.execute_construct(&pattern, templates, Rc::new(store), table, now()).unwrap();
    let triples: Vec<_> = graph.collect::<Result<_, _>>().unwrap();
    assert!(triples.is_empty());
}

/// Property 7: round-trip — comparing a result set against itself under
/// `compare_solutions` always reports equal.
#[test]
fn round_trip_compares_equal_to_itself() {
    let mut table = VariablesTable::new();
    let s = table.add("s", VariableKind::Normal);
    let mut store = MemoryTripleSource::new();
    store.insert(n("urn:a"), n("urn:p"), n("urn:o"));
    store.insert(n("urn:b"), n("urn:p"), n("urn:o"));
    let pattern = project(bgp(vec![TriplePattern::new(var(s), NamedOrVariable::Term(n("urn:p").into()), term(n("urn:o")))]), vec![s]);

    let evaluator = QueryEvaluator::new();
    let results = evaluator.execute_select(&pattern, Rc::new(store), table, now()).unwrap();
    let solutions: Vec<_> = results.collect::<Result<_, _>>().unwrap();
    let report = rq::compare_solutions(&solutions, &solutions, &rq::ComparisonOptions::default()).unwrap();
    assert!(report.equal);
}
