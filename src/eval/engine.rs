//! Vertex-based unification engine
//!
//! Every struct field and list element becomes a vertex in an arena. A
//! vertex collects conjuncts (expressions or values unified into it), is
//! expanded into child arcs and leaf constraints, and is finally evaluated by
//! unifying its leaves with the struct or list built from its arcs.

use std::collections::{HashSet, VecDeque};

use super::ops::{self, Feature};
use super::unify::{self, meet};
use super::value::{Arm, Conflict, FieldValue, FileId, Kind, ListValue, SourceSpan, StructValue, Value};
use crate::parser::ast::{BinaryOp, Decl, Expr, File, LabelKind, ListLit, Segment, Spanned};

type VertexId = usize;

const ROOT: VertexId = 0;

#[derive(Debug, Clone)]
enum Source<'p> {
    /// Top-level declarations of one file
    Body(&'p [Spanned<Decl>], FileId),
    Expr(&'p Spanned<Expr>, FileId),
    Value(Value),
}

#[derive(Debug, Clone)]
struct Conjunct<'p> {
    source: Source<'p>,
    /// Vertex whose scope the source's references resolve from
    env: VertexId,
    closed: bool,
}

#[derive(Debug)]
enum ListSource<'p> {
    Literal {
        list: &'p ListLit,
        env: VertexId,
        file: FileId,
        closed: bool,
    },
    Value(ListValue),
}

#[derive(Debug, Clone, Copy)]
struct Guard<'p> {
    condition: &'p Spanned<Expr>,
    body: &'p [Spanned<Decl>],
    file: FileId,
    closed: bool,
}

#[derive(Debug)]
struct Arc {
    feature: Feature,
    vertex: VertexId,
    optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Expanding,
    Expanded,
}

#[derive(Debug)]
enum State {
    Pending,
    Running,
    Done(Value),
}

#[derive(Debug)]
struct Vertex<'p> {
    parent: Option<VertexId>,
    feature: Option<Feature>,
    conjuncts: Vec<Conjunct<'p>>,
    phase: Phase,
    arcs: Vec<Arc>,
    leaves: Vec<Conjunct<'p>>,
    lists: Vec<ListSource<'p>>,
    is_struct: bool,
    /// Labels declared by closed literals; `None` while the vertex is open
    allowed: Option<HashSet<String>>,
    /// A closed literal contained `...`
    open: bool,
    list_error: Option<Value>,
    list_open: bool,
    span: Option<SourceSpan>,
    /// Reference expressions already flattened into this vertex
    references: Vec<&'p Spanned<Expr>>,
    state: State,
}

impl<'p> Vertex<'p> {
    fn new(parent: Option<VertexId>, feature: Option<Feature>) -> Self {
        Self {
            parent,
            feature,
            conjuncts: Vec::new(),
            phase: Phase::Pending,
            arcs: Vec::new(),
            leaves: Vec::new(),
            lists: Vec::new(),
            is_struct: false,
            allowed: None,
            open: false,
            list_error: None,
            list_open: false,
            span: None,
            references: Vec::new(),
            state: State::Pending,
        }
    }

    /// Forget everything derived from the conjuncts
    fn reset(&mut self) {
        self.phase = Phase::Pending;
        self.arcs.clear();
        self.leaves.clear();
        self.lists.clear();
        self.is_struct = false;
        self.allowed = None;
        self.open = false;
        self.list_error = None;
        self.list_open = false;
        self.references.clear();
        self.state = State::Pending;
    }

    fn allow_fields(&mut self, decls: &[Spanned<Decl>]) {
        if let Some(allowed) = &mut self.allowed {
            for decl in decls {
                if let Decl::Field(field) = &decl.node {
                    allowed.insert(field.label.node.clone());
                }
            }
        }
    }
}

/// Work queued while expanding one vertex
#[derive(Default)]
struct Pass<'p> {
    /// Vertices whose conjuncts were already copied in
    seen: HashSet<VertexId>,
    embeds: VecDeque<Conjunct<'p>>,
    guards: VecDeque<Guard<'p>>,
    /// Literals whose own fields extend an embedded definition
    extensions: Vec<&'p [Spanned<Decl>]>,
}

enum Resolved {
    Vertex(VertexId),
    Value(Value),
}

/// Evaluate the files of one package, unified with `fills`, into a single value
pub(crate) fn evaluate<'p>(files: &[(FileId, &'p File)], fills: &[Value]) -> Value {
    let mut root = Vertex::new(None, None);
    for &(id, file) in files {
        root.conjuncts.push(Conjunct {
            source: Source::Body(&file.decls, id),
            env: ROOT,
            closed: false,
        });
    }
    for fill in fills {
        root.conjuncts.push(Conjunct {
            source: Source::Value(fill.clone()),
            env: ROOT,
            closed: false,
        });
    }

    let mut engine = Engine {
        vertices: vec![root],
    };
    engine.evaluate(ROOT)
}

struct Engine<'p> {
    vertices: Vec<Vertex<'p>>,
}

impl<'p> Engine<'p> {
    fn new_vertex(&mut self, parent: Option<VertexId>, feature: Option<Feature>) -> VertexId {
        self.vertices.push(Vertex::new(parent, feature));
        self.vertices.len() - 1
    }

    fn arc(&self, v: VertexId, feature: &Feature) -> Option<VertexId> {
        self.vertices[v]
            .arcs
            .iter()
            .find(|a| &a.feature == feature)
            .map(|a| a.vertex)
    }

    /// Find or create the child arc for `feature`
    fn child(&mut self, v: VertexId, feature: Feature, optional: bool) -> VertexId {
        if let Some(arc) = self.vertices[v].arcs.iter_mut().find(|a| a.feature == feature) {
            arc.optional &= optional;
            return arc.vertex;
        }
        let child = self.new_vertex(Some(v), Some(feature.clone()));
        self.vertices[v].arcs.push(Arc {
            feature,
            vertex: child,
            optional,
        });
        child
    }

    fn add_conjunct(&mut self, v: VertexId, conjunct: Conjunct<'p>) {
        let vertex = &mut self.vertices[v];
        // A guard body may extend a field its own condition already evaluated
        if vertex.phase == Phase::Expanded && !matches!(vertex.state, State::Running) {
            vertex.reset();
        }
        vertex.conjuncts.push(conjunct);
    }

    fn is_definition(&self, v: VertexId) -> bool {
        matches!(
            &self.vertices[v].feature,
            Some(Feature::Field(label)) if LabelKind::of(label) == LabelKind::Definition
        )
    }

    fn within_definition(&self, v: VertexId) -> bool {
        let mut current = Some(v);
        while let Some(id) = current {
            if self.is_definition(id) {
                return true;
            }
            current = self.vertices[id].parent;
        }
        false
    }

    fn arc_is_optional(&self, v: VertexId) -> bool {
        match self.vertices[v].parent {
            Some(parent) => self.vertices[parent]
                .arcs
                .iter()
                .any(|a| a.vertex == v && a.optional),
            None => false,
        }
    }

    /// Whether flattening `expr`, which resolves to `target`, into `v` re-enters
    /// an ancestor of `v`. `Some(true)` when the way back crosses an optional field.
    fn recursion(&self, target: VertexId, expr: &Spanned<Expr>, v: VertexId) -> Option<bool> {
        let mut optional = false;
        let mut current = v;
        while let Some(parent) = self.vertices[current].parent {
            optional |= self.arc_is_optional(current);
            let repeated = self.vertices[parent]
                .references
                .iter()
                .any(|r| std::ptr::eq(*r, expr));
            if parent == target || repeated {
                return Some(optional);
            }
            current = parent;
        }
        None
    }

    /// Field path of a vertex, for messages
    fn path(&self, v: VertexId) -> String {
        let mut features = Vec::new();
        let mut current = Some(v);
        while let Some(id) = current {
            if let Some(feature) = &self.vertices[id].feature {
                features.push(feature);
            }
            current = self.vertices[id].parent;
        }
        let mut path = String::new();
        for feature in features.into_iter().rev() {
            match feature {
                Feature::Field(label) if path.is_empty() => path.push_str(label),
                Feature::Field(label) => {
                    path.push('.');
                    path.push_str(label);
                }
                Feature::Index(i) => path.push_str(&format!("[{}]", i)),
            }
        }
        path
    }

    // ---- expansion ----

    fn expand(&mut self, v: VertexId) {
        if self.vertices[v].phase != Phase::Pending {
            return;
        }
        self.vertices[v].phase = Phase::Expanding;

        let conjuncts = self.vertices[v].conjuncts.clone();
        let mut pass = Pass::default();
        for conjunct in conjuncts {
            self.flatten(v, conjunct, &mut pass);
        }
        // Embeddings see every declared field, guards see every embedding
        loop {
            if let Some(embed) = pass.embeds.pop_front() {
                self.flatten(v, embed, &mut pass);
            } else if let Some(guard) = pass.guards.pop_front() {
                self.apply_guard(v, guard, &mut pass);
            } else {
                break;
            }
        }

        for decls in pass.extensions {
            self.vertices[v].allow_fields(decls);
        }

        self.build_list_arcs(v);
        self.vertices[v].phase = Phase::Expanded;
    }

    fn flatten(&mut self, v: VertexId, conjunct: Conjunct<'p>, pass: &mut Pass<'p>) {
        let Conjunct {
            source,
            env,
            closed,
        } = conjunct;
        match source {
            Source::Body(decls, file) => self.add_decls(v, decls, file, closed, pass),
            Source::Value(value) => self.add_value(v, value, closed),
            Source::Expr(expr, file) => match &expr.node {
                Expr::Struct(decls) => self.add_decls(v, decls, file, closed, pass),
                Expr::List(list) => self.vertices[v].lists.push(ListSource::Literal {
                    list,
                    env,
                    file,
                    closed,
                }),
                Expr::Binary(BinaryOp::And, left, right) => {
                    for side in [left, right] {
                        let conjunct = Conjunct {
                            source: Source::Expr(&**side, file),
                            env,
                            closed,
                        };
                        self.flatten(v, conjunct, pass);
                    }
                }
                Expr::Ident(_) | Expr::Selector(..) | Expr::Index(..) => {
                    self.flatten_reference(v, expr, file, env, closed, pass)
                }
                _ => self.vertices[v].leaves.push(Conjunct {
                    source: Source::Expr(expr, file),
                    env,
                    closed,
                }),
            },
        }
    }

    fn add_decls(
        &mut self,
        v: VertexId,
        decls: &'p [Spanned<Decl>],
        file: FileId,
        closed: bool,
        pass: &mut Pass<'p>,
    ) {
        let closes = closed || self.is_definition(v);
        let vertex = &mut self.vertices[v];
        vertex.is_struct = true;
        if closes {
            vertex.allowed.get_or_insert_with(HashSet::new);
        }

        let mut embeds = false;
        for decl in decls {
            match &decl.node {
                Decl::Field(field) => {
                    let label = field.label.node.clone();
                    if closes {
                        if let Some(allowed) = &mut self.vertices[v].allowed {
                            allowed.insert(label.clone());
                        }
                    }
                    let child = self.child(v, Feature::Field(label), field.optional);
                    if self.vertices[child].span.is_none() {
                        self.vertices[child].span = Some(SourceSpan {
                            file,
                            span: field.label.span.clone(),
                        });
                    }
                    self.add_conjunct(
                        child,
                        Conjunct {
                            source: Source::Expr(&field.value, file),
                            env: v,
                            closed: closes,
                        },
                    );
                }
                Decl::Embed(expr) => {
                    embeds = true;
                    pass.embeds.push_back(Conjunct {
                        source: Source::Expr(expr, file),
                        env: v,
                        closed: closes,
                    });
                }
                Decl::Ellipsis => {
                    if closes {
                        self.vertices[v].open = true;
                    }
                }
                Decl::If { condition, body } => pass.guards.push_back(Guard {
                    condition,
                    body,
                    file,
                    closed: closes,
                }),
            }
        }

        // Fields declared next to an embedded definition extend it
        if embeds && !closes {
            pass.extensions.push(decls);
        }
    }

    fn add_value(&mut self, v: VertexId, value: Value, closed: bool) {
        match value {
            Value::Struct(s) => {
                self.vertices[v].is_struct = true;
                for field in s.fields {
                    let child = self.child(v, Feature::Field(field.label), field.optional);
                    self.add_conjunct(
                        child,
                        Conjunct {
                            source: Source::Value(field.value),
                            env: v,
                            closed,
                        },
                    );
                }
            }
            Value::List(list) => self.vertices[v].lists.push(ListSource::Value(list)),
            other => self.vertices[v].leaves.push(Conjunct {
                source: Source::Value(other),
                env: v,
                closed,
            }),
        }
    }

    fn flatten_reference(
        &mut self,
        v: VertexId,
        expr: &'p Spanned<Expr>,
        file: FileId,
        env: VertexId,
        closed: bool,
        pass: &mut Pass<'p>,
    ) {
        match self.resolve(expr, env, file) {
            Resolved::Vertex(target) => {
                if target == v {
                    return;
                }
                match self.recursion(target, expr, v) {
                    None => self.flatten_target(v, target, expr, closed, pass),
                    // an optional field stops the recursion and stays unexpanded
                    Some(true) => {}
                    Some(false) => {
                        let conflict = Conflict {
                            message: format!("structural cycle at {}", self.path(v)),
                            span: Some(SourceSpan {
                                file,
                                span: expr.span.clone(),
                            }),
                        };
                        self.vertices[v].leaves.push(Conjunct {
                            source: Source::Value(Value::Bottom(conflict)),
                            env,
                            closed,
                        });
                    }
                }
            }
            Resolved::Value(value) => {
                let value = with_span(value, file, &expr.span);
                self.add_value(v, value, closed);
            }
        }
    }

    fn flatten_target(
        &mut self,
        v: VertexId,
        target: VertexId,
        expr: &'p Spanned<Expr>,
        closed: bool,
        pass: &mut Pass<'p>,
    ) {
        if !pass.seen.insert(target) {
            return;
        }
        self.vertices[v].references.push(expr);
        let closes = closed || self.within_definition(target);
        let conjuncts = self.vertices[target].conjuncts.clone();
        for conjunct in conjuncts {
            let closed = conjunct.closed || closes;
            self.flatten(v, Conjunct { closed, ..conjunct }, pass);
        }
    }

    fn apply_guard(&mut self, v: VertexId, guard: Guard<'p>, pass: &mut Pass<'p>) {
        let condition = self.eval_expr(guard.condition, v, guard.file);
        let leaf = match condition.default_value() {
            Value::Bool(true) => {
                self.add_decls(v, guard.body, guard.file, guard.closed, pass);
                return;
            }
            Value::Bool(false) => return,
            Value::Bottom(_) => condition.default_value().clone(),
            Value::Incomplete(reason) => Value::Incomplete(reason.clone()),
            other if other.is_scalar() || matches!(other, Value::Struct(_) | Value::List(_)) => {
                with_span(
                    Value::bottom(format!(
                        "cannot use {} ({}) as bool in if condition",
                        other,
                        other.kind_name()
                    )),
                    guard.file,
                    &guard.condition.span,
                )
            }
            other => Value::Incomplete(format!("non-concrete if condition {}", other)),
        };
        self.vertices[v].leaves.push(Conjunct {
            source: Source::Value(leaf),
            env: v,
            closed: guard.closed,
        });
    }

    fn build_list_arcs(&mut self, v: VertexId) {
        let sources = std::mem::take(&mut self.vertices[v].lists);
        if sources.is_empty() {
            return;
        }

        let mut closed_len: Option<usize> = None;
        let mut longest = 0;
        let mut error = None;
        for source in &sources {
            let (len, open) = match source {
                ListSource::Literal { list, .. } => (list.elements.len(), list.tail.is_some()),
                ListSource::Value(list) => (list.elements.len(), list.open),
            };
            longest = longest.max(len);
            if !open {
                match closed_len {
                    Some(n) if n != len => {
                        error.get_or_insert_with(|| {
                            Value::bottom(format!("incompatible list lengths ({} and {})", n, len))
                        });
                    }
                    _ => closed_len = Some(len),
                }
            }
        }
        let len = closed_len.unwrap_or(longest);
        if longest > len {
            error.get_or_insert_with(|| {
                Value::bottom(format!("incompatible list lengths ({} and {})", longest, len))
            });
        }

        for index in 0..len {
            let child = self.child(v, Feature::Index(index), false);
            for source in &sources {
                let conjunct = match source {
                    ListSource::Literal {
                        list,
                        env,
                        file,
                        closed,
                    } => {
                        let list: &'p ListLit = *list;
                        let element = list.elements.get(index).or(match &list.tail {
                            Some(Some(tail)) => Some(&**tail),
                            _ => None,
                        });
                        element.map(|expr| Conjunct {
                            source: Source::Expr(expr, *file),
                            env: *env,
                            closed: *closed,
                        })
                    }
                    ListSource::Value(list) => list.elements.get(index).map(|value| Conjunct {
                        source: Source::Value(value.clone()),
                        env: v,
                        closed: false,
                    }),
                };
                if let Some(conjunct) = conjunct {
                    self.add_conjunct(child, conjunct);
                }
            }
        }

        let vertex = &mut self.vertices[v];
        vertex.lists = sources;
        vertex.list_open = closed_len.is_none();
        vertex.list_error = error;
    }

    // ---- references ----

    fn resolve(&mut self, expr: &'p Spanned<Expr>, env: VertexId, file: FileId) -> Resolved {
        match &expr.node {
            Expr::Ident(ident) => self.resolve_ident(ident.as_str(), env),
            Expr::Selector(base, label) => {
                let base = self.resolve(base, env, file);
                self.select(base, Feature::Field(label.node.clone()))
            }
            Expr::Index(base, index) => {
                let base = self.resolve(base, env, file);
                match ops::feature_of(self.eval_expr(index, env, file)) {
                    Ok(feature) => self.select(base, feature),
                    Err(value) => Resolved::Value(value),
                }
            }
            _ => Resolved::Value(self.eval_expr(expr, env, file)),
        }
    }

    fn resolve_ident(&mut self, name: &str, env: VertexId) -> Resolved {
        let feature = Feature::Field(name.to_string());
        let mut scope = Some(env);
        while let Some(id) = scope {
            self.expand(id);
            if let Some(child) = self.arc(id, &feature) {
                return Resolved::Vertex(child);
            }
            scope = self.vertices[id].parent;
        }
        Resolved::Value(predeclared(name))
    }

    fn select(&mut self, base: Resolved, feature: Feature) -> Resolved {
        match base {
            Resolved::Vertex(target) => {
                self.expand(target);
                match self.arc(target, &feature) {
                    Some(child) => Resolved::Vertex(child),
                    None => {
                        let value = self.evaluate(target);
                        Resolved::Value(ops::select(&value, &feature))
                    }
                }
            }
            Resolved::Value(value) => Resolved::Value(ops::select(&value, &feature)),
        }
    }

    // ---- evaluation ----

    fn evaluate(&mut self, v: VertexId) -> Value {
        match &self.vertices[v].state {
            State::Done(value) => return value.clone(),
            State::Running => {
                return Value::Incomplete(format!("cycle in evaluation of {}", self.path(v)))
            }
            State::Pending => {}
        }
        self.vertices[v].state = State::Running;
        self.expand(v);

        let leaves = self.vertices[v].leaves.clone();
        let mut value = Value::Top;
        for leaf in leaves {
            value = match leaf.source {
                Source::Expr(expr, file) => {
                    let leaf_value = self.eval_expr(expr, leaf.env, file);
                    with_span(meet(value, leaf_value), file, &expr.span)
                }
                Source::Value(leaf_value) => meet(value, leaf_value),
                Source::Body(..) => value,
            };
        }

        let composite = self.composite(v);
        let mut value = meet(composite, value);
        if let Value::Bottom(conflict) = &mut value {
            if conflict.span.is_none() {
                conflict.span = self.vertices[v].span.clone();
            }
        }
        self.vertices[v].state = State::Done(value.clone());
        value
    }

    fn composite(&mut self, v: VertexId) -> Value {
        let vertex = &self.vertices[v];
        match (vertex.is_struct, !vertex.lists.is_empty()) {
            (true, true) => Value::bottom(
                "conflicting values struct and list (mismatched types struct and list)",
            ),
            (true, false) => self.struct_value(v),
            (false, true) => self.list_value(v),
            (false, false) => Value::Top,
        }
    }

    fn struct_value(&mut self, v: VertexId) -> Value {
        let arcs: Vec<(Feature, VertexId, bool)> = self.vertices[v]
            .arcs
            .iter()
            .map(|a| (a.feature.clone(), a.vertex, a.optional))
            .collect();
        let closed = match &self.vertices[v].allowed {
            Some(allowed) if !self.vertices[v].open => Some(allowed.clone()),
            _ => None,
        };

        let mut fields = Vec::with_capacity(arcs.len());
        for (feature, child, optional) in arcs {
            let Feature::Field(label) = feature else {
                continue;
            };
            let permitted = match &closed {
                Some(allowed) => {
                    LabelKind::of(&label) != LabelKind::Regular || allowed.contains(&label)
                }
                None => true,
            };
            let value = if permitted {
                self.evaluate(child)
            } else {
                Value::Bottom(Conflict {
                    message: format!("field \"{}\" not allowed", label),
                    span: self.vertices[child].span.clone(),
                })
            };
            fields.push(FieldValue {
                label,
                value,
                optional,
            });
        }
        Value::Struct(StructValue { fields })
    }

    fn list_value(&mut self, v: VertexId) -> Value {
        if let Some(error) = &self.vertices[v].list_error {
            return error.clone();
        }
        let elements: Vec<VertexId> = self.vertices[v]
            .arcs
            .iter()
            .filter(|a| matches!(a.feature, Feature::Index(_)))
            .map(|a| a.vertex)
            .collect();
        let open = self.vertices[v].list_open;
        let elements = elements.into_iter().map(|e| self.evaluate(e)).collect();
        Value::List(ListValue { elements, open })
    }

    /// Evaluate an expression in leaf position
    fn eval_expr(&mut self, expr: &'p Spanned<Expr>, env: VertexId, file: FileId) -> Value {
        let value = self.eval_inner(expr, env, file);
        with_span(value, file, &expr.span)
    }

    fn eval_inner(&mut self, expr: &'p Spanned<Expr>, env: VertexId, file: FileId) -> Value {
        match &expr.node {
            Expr::Top => Value::Top,
            Expr::Null => Value::Null,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Int(n) => Value::Int(*n),
            Expr::Float(x) => Value::Float(*x),
            Expr::String(s) => Value::String(s.clone()),
            Expr::Interpolation(segments) => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        Segment::Text(text) => out.push_str(text),
                        Segment::Expr(inner) => {
                            let value = self.eval_expr(inner, env, file);
                            match ops::interpolate(&value) {
                                Ok(text) => out.push_str(&text),
                                Err(err) => return err,
                            }
                        }
                    }
                }
                Value::String(out)
            }
            Expr::Ident(_) | Expr::Selector(..) | Expr::Index(..) => {
                match self.resolve(expr, env, file) {
                    Resolved::Vertex(target) => self.evaluate(target),
                    Resolved::Value(value) => value,
                }
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval_expr(arg, env, file))
                    .collect();
                ops::call(name.node.as_str(), args)
            }
            Expr::Unary(op, operand) => ops::unary(*op, self.eval_expr(operand, env, file)),
            Expr::Binary(BinaryOp::Or, ..) => {
                let mut alternatives = Vec::new();
                collect_arms(expr, &mut alternatives);
                let arms = alternatives
                    .into_iter()
                    .map(|alternative| {
                        let (is_default, inner) = match &alternative.node {
                            Expr::Default(inner) => (true, &**inner),
                            _ => (false, alternative),
                        };
                        Arm {
                            value: self.eval_expr(inner, env, file),
                            is_default,
                        }
                    })
                    .collect();
                unify::disjunction(arms)
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let left = self.eval_expr(left, env, file);
                let right = self.eval_expr(right, env, file);
                meet(left, right)
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval_expr(left, env, file);
                let right = self.eval_expr(right, env, file);
                ops::binary(*op, left, right)
            }
            Expr::Default(inner) => self.eval_expr(inner, env, file),
            Expr::Struct(_) | Expr::List(_) => {
                let scratch = self.new_vertex(Some(env), None);
                self.vertices[scratch].conjuncts.push(Conjunct {
                    source: Source::Expr(expr, file),
                    env,
                    closed: false,
                });
                self.evaluate(scratch)
            }
        }
    }
}

fn collect_arms<'p>(expr: &'p Spanned<Expr>, out: &mut Vec<&'p Spanned<Expr>>) {
    match &expr.node {
        Expr::Binary(BinaryOp::Or, left, right) => {
            collect_arms(left, out);
            collect_arms(right, out);
        }
        _ => out.push(expr),
    }
}

fn predeclared(name: &str) -> Value {
    match name {
        "int" => Value::Kind(Kind::Int),
        "float" => Value::Kind(Kind::Float),
        "number" => Value::Kind(Kind::Number),
        "string" => Value::Kind(Kind::String),
        "bool" => Value::Kind(Kind::Bool),
        _ => Value::bottom(format!("reference \"{}\" not found", name)),
    }
}

/// Attach a source location to a bottom value that has none yet
fn with_span(value: Value, file: FileId, span: &std::ops::Range<usize>) -> Value {
    match value {
        Value::Bottom(mut conflict) if conflict.span.is_none() => {
            conflict.span = Some(SourceSpan {
                file,
                span: span.clone(),
            });
            Value::Bottom(conflict)
        }
        other => other,
    }
}
