/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Parser for bracketed rule text:
//!
//! ```text
//! @prefix ex: <http://example.org/> .
//! # comment
//! [worksIn: (?x rdf:type ex:Employee) (?x ex:dept ?d) -> (?x ex:worksIn ?d)]
//! [version: -> (ex:schema ex:version "1")]
//! [(?b ex:parent ?a) <- (?a ex:child ?b)]
//! ```
//!
//! `?name` is a variable, `_` a wildcard, `<...>` an IRI and `"..."` a
//! literal; any other word is a name, expanded when its prefix is declared.
//! Variables get ordinals in order of first appearance in the body, then
//! the head.

use std::collections::HashMap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace1, not_line_ending},
    combinator::{eof, map, opt, value},
    multi::many0,
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};
use shared::dictionary::Dictionary;
use shared::rule::{Direction, Rule};
use shared::terms::{Term, TriplePattern};
use crate::error::{ReteError, Result};

#[derive(Debug, Clone, PartialEq)]
enum UnresolvedTerm<'a> {
    Var(&'a str),
    Wildcard,
    Name(&'a str),
    Iri(&'a str),
    Literal(&'a str),
}

type UnresolvedPattern<'a> = (UnresolvedTerm<'a>, UnresolvedTerm<'a>, UnresolvedTerm<'a>);

#[derive(Debug)]
struct UnresolvedRule<'a> {
    name: Option<&'a str>,
    body: Vec<UnresolvedPattern<'a>>,
    head: Vec<UnresolvedPattern<'a>>,
    direction: Direction,
}

#[derive(Debug)]
enum Statement<'a> {
    Prefix(&'a str, &'a str),
    Rule(UnresolvedRule<'a>),
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_name_char(c: char) -> bool {
    is_word_char(c) || c == '-' || c == ':'
}

/// Whitespace and `#` comments.
fn ws(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((multispace1, preceded(char('#'), not_line_ending)))))(input)
}

fn separator(input: &str) -> IResult<&str, ()> {
    value((), tuple((ws, opt(char(',')), ws)))(input)
}

fn parse_term(input: &str) -> IResult<&str, UnresolvedTerm<'_>> {
    alt((
        map(preceded(char('?'), take_while1(is_word_char)), UnresolvedTerm::Var),
        map(delimited(char('<'), take_until(">"), char('>')), UnresolvedTerm::Iri),
        map(delimited(char('"'), take_until("\""), char('"')), UnresolvedTerm::Literal),
        map(take_while1(is_name_char), |word: &str| {
            if word == "_" {
                UnresolvedTerm::Wildcard
            } else {
                UnresolvedTerm::Name(word)
            }
        }),
    ))(input)
}

fn parse_pattern(input: &str) -> IResult<&str, UnresolvedPattern<'_>> {
    let (input, _) = char('(')(input)?;
    let (input, _) = ws(input)?;
    let (input, subject) = parse_term(input)?;
    let (input, _) = separator(input)?;
    let (input, predicate) = parse_term(input)?;
    let (input, _) = separator(input)?;
    let (input, object) = parse_term(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(')')(input)?;
    Ok((input, (subject, predicate, object)))
}

fn parse_patterns(input: &str) -> IResult<&str, Vec<UnresolvedPattern<'_>>> {
    many0(terminated(parse_pattern, separator))(input)
}

fn parse_rule(input: &str) -> IResult<&str, UnresolvedRule<'_>> {
    let (input, _) = char('[')(input)?;
    let (input, _) = ws(input)?;
    let (input, name) = opt(terminated(take_while1(is_word_char), preceded(ws, char(':'))))(input)?;
    let (input, _) = ws(input)?;
    let (input, left) = parse_patterns(input)?;
    let (input, arrow) = alt((tag("->"), tag("<-")))(input)?;
    let (input, _) = ws(input)?;
    let (input, right) = parse_patterns(input)?;
    let (input, _) = char(']')(input)?;

    // `head <- body` is the backward notation.
    let rule = if arrow == "->" {
        UnresolvedRule { name, body: left, head: right, direction: Direction::Forward }
    } else {
        UnresolvedRule { name, body: right, head: left, direction: Direction::Backward }
    };
    Ok((input, rule))
}

fn parse_prefix(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = tag("@prefix")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, prefix) = terminated(take_while(is_word_char), char(':'))(input)?;
    let (input, _) = ws(input)?;
    let (input, iri) = delimited(char('<'), take_until(">"), char('>'))(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char('.')(input)?;
    Ok((input, (prefix, iri)))
}

fn parse_document(input: &str) -> IResult<&str, Vec<Statement<'_>>> {
    let (input, _) = ws(input)?;
    let (input, statements) = many0(terminated(
        alt((
            map(parse_prefix, |(prefix, iri)| Statement::Prefix(prefix, iri)),
            map(parse_rule, Statement::Rule),
        )),
        ws,
    ))(input)?;
    let (input, _) = eof(input)?;
    Ok((input, statements))
}

/// Turns parsed text into dictionary-encoded rules.
struct Resolver<'d> {
    dictionary: &'d mut Dictionary,
    prefixes: HashMap<String, String>,
}

impl<'d> Resolver<'d> {
    fn resolve_rule<'a>(&mut self, rule: &UnresolvedRule<'a>) -> Rule {
        let mut vars: Vec<&'a str> = Vec::new();
        let body: Vec<TriplePattern> =
            rule.body.iter().map(|p| self.resolve_pattern(p, &mut vars)).collect();
        let head: Vec<TriplePattern> =
            rule.head.iter().map(|p| self.resolve_pattern(p, &mut vars)).collect();

        let mut resolved = Rule::new(body, head);
        resolved.num_vars = vars.len();
        if let Some(name) = rule.name {
            resolved = resolved.named(name);
        }
        if rule.direction == Direction::Backward {
            resolved = resolved.backward();
        }
        resolved
    }

    fn resolve_pattern<'a>(
        &mut self,
        pattern: &UnresolvedPattern<'a>,
        vars: &mut Vec<&'a str>,
    ) -> TriplePattern {
        TriplePattern::new(
            self.resolve_term(&pattern.0, vars),
            self.resolve_term(&pattern.1, vars),
            self.resolve_term(&pattern.2, vars),
        )
    }

    fn resolve_term<'a>(&mut self, term: &UnresolvedTerm<'a>, vars: &mut Vec<&'a str>) -> Term {
        match *term {
            UnresolvedTerm::Var(name) => {
                let index = vars.iter().position(|v| *v == name).unwrap_or_else(|| {
                    vars.push(name);
                    vars.len() - 1
                });
                Term::Variable(index)
            }
            UnresolvedTerm::Wildcard => Term::Wildcard,
            UnresolvedTerm::Iri(iri) => Term::Constant(self.dictionary.encode(iri)),
            UnresolvedTerm::Literal(literal) => {
                Term::Constant(self.dictionary.encode(&format!("\"{}\"", literal)))
            }
            UnresolvedTerm::Name(word) => {
                let expanded = word.split_once(':').and_then(|(prefix, local)| {
                    self.prefixes.get(prefix).map(|ns| format!("{}{}", ns, local))
                });
                match expanded {
                    Some(iri) => Term::Constant(self.dictionary.encode(&iri)),
                    None => Term::Constant(self.dictionary.encode(word)),
                }
            }
        }
    }
}

fn snippet(input: &str) -> String {
    input.chars().take(40).collect()
}

/// Parses a sequence of prefix declarations and bracketed rules, encoding
/// every constant through `dictionary`. Prefixes apply to the rules after
/// them.
pub fn parse_rules(text: &str, dictionary: &mut Dictionary) -> Result<Vec<Rule>> {
    let (_, statements) = parse_document(text).map_err(|e| match e {
        nom::Err::Error(err) | nom::Err::Failure(err) => {
            ReteError::Parse(format!("unexpected input near `{}`", snippet(err.input)))
        }
        nom::Err::Incomplete(_) => ReteError::Parse("incomplete rule text".to_string()),
    })?;

    let mut resolver = Resolver { dictionary, prefixes: HashMap::new() };
    let mut rules = Vec::new();
    for statement in &statements {
        match statement {
            Statement::Prefix(prefix, iri) => {
                resolver.prefixes.insert(prefix.to_string(), iri.to_string());
            }
            Statement::Rule(rule) => rules.push(resolver.resolve_rule(rule)),
        }
    }
    Ok(rules)
}
