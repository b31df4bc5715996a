//! Field reflection for aggregate types.
//!
//! A [`FieldsTrait`] describes the named fields of a type as an
//! insertion-ordered list. Each [`Field`] carries a pair of type-erased
//! accessors, so generic code can view a field of any instance handed to
//! it as `&dyn Any`, without compile-time knowledge of the containing
//! type or field offsets.

use std::any::Any;

use super::Type;

type View = Box<dyn Fn(&dyn Any) -> Option<&dyn Any> + Send + Sync>;
type ViewMut = Box<dyn Fn(&mut dyn Any) -> Option<&mut dyn Any> + Send + Sync>;

/// A single named field of a reflected type.
pub struct Field {
    ty: Type,
    name: String,
    view: View,
    view_mut: ViewMut,
}

impl Field {
    /// Descriptor of the field's type.
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Field name, unique within the containing type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type-erased view of this field within `instance`.
    ///
    /// Returns `None` when `instance` is not of the type this field
    /// belongs to.
    pub fn view<'a>(&self, instance: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.view)(instance)
    }

    /// Type-erased mutable view of this field within `instance`.
    pub fn view_mut<'a>(&self, instance: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.view_mut)(instance)
    }

    /// Typed shortcut over [`Field::view`].
    pub fn get<'a, F: 'static>(&self, instance: &'a dyn Any) -> Option<&'a F> {
        self.view(instance)?.downcast_ref::<F>()
    }

    /// Typed shortcut over [`Field::view_mut`].
    pub fn get_mut<'a, F: 'static>(&self, instance: &'a mut dyn Any) -> Option<&'a mut F> {
        self.view_mut(instance)?.downcast_mut::<F>()
    }
}

/// Insertion-ordered list of the named fields of one type.
///
/// Built once at type-registration time with [`FieldsTrait::with_field`]
/// and immutable afterwards. The list owns its fields; it is never shared
/// between two trait values.
#[derive(Default)]
pub struct FieldsTrait {
    fields: Vec<Field>,
}

impl FieldsTrait {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field described by a pair of accessor functions.
    ///
    /// # Panics
    ///
    /// Panics if a field with the same name was already added. Duplicate
    /// field names indicate a wiring mistake in type registration.
    pub fn with_field<S, F>(
        mut self,
        name: impl Into<String>,
        getter: fn(&S) -> &F,
        getter_mut: fn(&mut S) -> &mut F,
    ) -> Self
    where
        S: 'static,
        F: 'static,
    {
        let name = name.into();
        assert!(
            !self.fields.iter().any(|field| field.name == name),
            "field '{name}' already exists"
        );
        self.fields.push(Field {
            ty: Type::of::<F>(),
            name,
            view: Box::new(move |instance| {
                instance.downcast_ref::<S>().map(|s| getter(s) as &dyn Any)
            }),
            view_mut: Box::new(move |instance| {
                instance
                    .downcast_mut::<S>()
                    .map(|s| getter_mut(s) as &mut dyn Any)
            }),
        });
        self
    }

    /// Find a field by name with a linear scan.
    ///
    /// A miss is a recoverable data error: it is logged and `None` is
    /// returned for the caller to check.
    pub fn field(&self, name: &str) -> Option<&Field> {
        let found = self.fields.iter().find(|field| field.name == name);
        if found.is_none() {
            tracing::error!(field = name, "no such field");
        }
        found
    }

    /// First field in insertion order, if any.
    pub fn first_field(&self) -> Option<&Field> {
        self.fields.first()
    }

    /// Iterate over all fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Transform {
        position: [f32; 3],
        scale: f32,
    }

    fn transform_fields() -> FieldsTrait {
        FieldsTrait::new()
            .with_field("position", |t: &Transform| &t.position, |t| &mut t.position)
            .with_field("scale", |t: &Transform| &t.scale, |t| &mut t.scale)
    }

    #[test]
    fn fields_keep_insertion_order() {
        let fields = transform_fields();
        let names: Vec<_> = fields.iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, ["position", "scale"]);
        assert_eq!(fields.first_field().unwrap().name(), "position");
        assert_eq!(fields.len(), 2);
    }

    #[test]
    #[should_panic(expected = "already exists")]
    fn duplicate_field_name_panics() {
        FieldsTrait::new()
            .with_field("scale", |t: &Transform| &t.scale, |t| &mut t.scale)
            .with_field("scale", |t: &Transform| &t.scale, |t| &mut t.scale);
    }

    #[test]
    fn missing_field_returns_none() {
        let fields = transform_fields();
        assert!(fields.field("rotation").is_none());
    }

    #[test]
    fn typed_access_through_erased_instance() {
        let fields = transform_fields();
        let mut value = Transform {
            position: [1.0, 2.0, 3.0],
            scale: 1.0,
        };

        let scale = fields.field("scale").unwrap();
        assert!(scale.ty().is::<f32>());
        assert_eq!(scale.get::<f32>(&value), Some(&1.0));

        *scale.get_mut::<f32>(&mut value).unwrap() = 2.5;
        assert_eq!(value.scale, 2.5);
    }

    #[test]
    fn foreign_instance_yields_none() {
        let fields = transform_fields();
        let not_a_transform = 42u32;
        assert!(fields.field("scale").unwrap().view(&not_a_transform).is_none());
    }
}
