// Product generators: tuples and user structs.
//
// A tuple of generators is itself a generator of tuples. Fields are drawn
// left to right and shrunk one at a time, leaving the other fields and
// their contexts untouched. Structs are described by a tuple of field
// generators plus a pair of functions converting between the struct and
// the tuple of its fields.

use std::fmt;

use super::{element_contexts, traced, Generate, Generated, Generator, ShrinkContext};
use crate::entropy::Random;
use crate::error::Result;

macro_rules! tuple_generators {
    ($(($($g:ident $i:tt),+))+) => {
        $(
            impl<$($g: Generator),+> Generator for ($($g,)+) {
                type Value = ($($g::Value,)+);

                fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<Self::Value>> {
                    traced(random, |random| {
                        let mut contexts = Vec::new();
                        let value = ($({
                            let field = self.$i.generate(random)?;
                            contexts.push(field.context);
                            field.value
                        },)+);
                        Ok(Generated::new(value).with_context(contexts))
                    })
                }

                fn shrink(
                    &self,
                    value: &Self::Value,
                    context: Option<&ShrinkContext>,
                ) -> Result<Vec<Generated<Self::Value>>> {
                    let arity = [$($i),+].len();
                    let contexts = element_contexts(context, arity);
                    let mut candidates = Vec::new();
                    $(
                        let field_context = contexts[$i].as_ref();
                        if field_context.is_some() || self.$i.can_shrink_without_context(&value.$i) {
                            for candidate in self.$i.shrink(&value.$i, field_context)? {
                                let mut next = value.clone();
                                next.$i = candidate.value;
                                let mut next_contexts = contexts.clone();
                                next_contexts[$i] = candidate.context;
                                candidates.push(Generated::new(next).with_context(next_contexts));
                            }
                        }
                    )+
                    Ok(candidates)
                }

                fn can_shrink_without_context(&self, value: &Self::Value) -> bool {
                    false $(|| self.$i.can_shrink_without_context(&value.$i))+
                }
            }

            impl<$($g: Generate),+> Generate for ($($g,)+) {
                type Generator = ($($g::Generator,)+);

                fn generator() -> Self::Generator {
                    ($($g::generator(),)+)
                }
            }
        )+
    };
}

tuple_generators! {
    (A 0)
    (A 0, B 1)
    (A 0, B 1, C 2)
    (A 0, B 1, C 2, D 3)
    (A 0, B 1, C 2, D 3, E 4)
    (A 0, B 1, C 2, D 3, E 4, F 5)
}

/// A struct built from a tuple of field generators.
///
/// `build` assembles the struct from its fields and `split` takes it apart
/// again, which lets shrinking work one field at a time even for values
/// that arrive without a context.
pub struct StructGenerator<G, S, B, D> {
    fields: G,
    build: B,
    split: D,
    marker: std::marker::PhantomData<fn() -> S>,
}

pub fn structs<G, S, B, D>(fields: G, build: B, split: D) -> StructGenerator<G, S, B, D>
where
    G: Generator,
    S: Clone + fmt::Debug + 'static,
    B: Fn(G::Value) -> S,
    D: Fn(&S) -> G::Value,
{
    StructGenerator {
        fields,
        build,
        split,
        marker: std::marker::PhantomData,
    }
}

impl<G: fmt::Debug, S, B, D> fmt::Debug for StructGenerator<G, S, B, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructGenerator")
            .field("fields", &self.fields)
            .finish()
    }
}

impl<G, S, B, D> Generator for StructGenerator<G, S, B, D>
where
    G: Generator,
    S: Clone + fmt::Debug + 'static,
    B: Fn(G::Value) -> S,
    D: Fn(&S) -> G::Value,
{
    type Value = S;

    fn generate(&self, random: &mut Random<'_, '_>) -> Result<Generated<S>> {
        let fields = self.fields.generate(random)?;
        Ok(Generated {
            value: (self.build)(fields.value),
            context: fields.context,
            provenance: fields.provenance,
        })
    }

    fn shrink(&self, value: &S, context: Option<&ShrinkContext>) -> Result<Vec<Generated<S>>> {
        let fields = (self.split)(value);
        Ok(self
            .fields
            .shrink(&fields, context)?
            .into_iter()
            .map(|candidate| Generated {
                value: (self.build)(candidate.value),
                context: candidate.context,
                provenance: None,
            })
            .collect())
    }

    fn can_shrink_without_context(&self, value: &S) -> bool {
        self.fields.can_shrink_without_context(&(self.split)(value))
    }
}
