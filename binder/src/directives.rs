//! Directive registry
//!
//! Built-in validators and sanitizers are looked up by case-insensitive name in
//! two static tables. Custom directives live on the schema that declares them,
//! registered by name in [`CustomDirectives`] while the schema is described.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use serde_json::Value;

use crate::instance::DirectiveContext;
use crate::sanitizers;
use crate::schema::Params;
use crate::validators;

/// Built-in predicate over the working value
pub type BuiltinValidator = fn(&Value, &Params) -> bool;

/// Built-in transform of the working value
pub type BuiltinSanitizer = fn(Value, &Params) -> Value;

/// Schema-owned validator. `Err` carries the message recorded verbatim.
pub type CustomValidator = fn(&Value, &Params, &DirectiveContext<'_>) -> Result<(), String>;

/// Schema-owned sanitizer
pub type CustomSanitizer = fn(Value, &Params, &DirectiveContext<'_>) -> Value;

/// Name of the list composition directive
pub const LIST_OF_OBJECTS: &str = "listOfObjects";

lazy_static! {
    static ref VALIDATORS: HashMap<&'static str, BuiltinValidator> = {
        let mut table: HashMap<&'static str, BuiltinValidator> = HashMap::new();
        table.insert("notempty", validators::not_empty);
        table.insert("string", validators::string);
        table.insert("boolean", validators::boolean);
        table.insert("phone", validators::phone);
        table.insert("email", validators::email);
        table.insert("enum", validators::one_of);
        table.insert("interval", validators::interval);
        table.insert("integer", validators::integer);
        table.insert("minlength", validators::min_length);
        table.insert("maxlength", validators::max_length);
        table.insert("list", validators::list);
        table.insert("date", validators::date);
        table.insert("datetime", validators::date_time);
        table.insert("datetimeiso8601", validators::date_time_iso8601);
        table.insert("enforcedpassword", validators::enforced_password);
        table.insert("url", validators::url);
        table.insert("cpfcnpj", validators::cpf_cnpj);
        table.insert("cpf", validators::cpf);
        table.insert("cnpj", validators::cnpj);
        table.insert("currency", validators::currency);
        table.insert("scalartype", validators::scalar_type);
        table.insert("nohtml", validators::no_html);
        table.insert("noxss", validators::no_xss);
        table
    };

    static ref SANITIZERS: HashMap<&'static str, BuiltinSanitizer> = {
        let mut table: HashMap<&'static str, BuiltinSanitizer> = HashMap::new();
        table.insert("alphanum", sanitizers::alpha_num);
        table.insert("safestring", sanitizers::safe_string);
        table.insert("lower", sanitizers::lower);
        table.insert("phonebr", sanitizers::phone_br);
        table.insert("email", sanitizers::email);
        table.insert("cpfcnpj", sanitizers::cpf_cnpj);
        table.insert("defaultifempty", sanitizers::default_if_empty);
        table.insert("boolean", sanitizers::boolean);
        table.insert("integer", sanitizers::integer);
        table.insert("truncate", sanitizers::truncate);
        table.insert("currency", sanitizers::currency);
        table.insert("trim", sanitizers::trim);
        table.insert("striphtml", sanitizers::strip_html);
        table.insert("normalizewhitespace", sanitizers::normalize_whitespace);
        table.insert("removecontrolchars", sanitizers::remove_control_chars);
        table
    };
}

pub fn builtin_validator(name: &str) -> Option<BuiltinValidator> {
    VALIDATORS.get(name.to_lowercase().as_str()).copied()
}

pub fn builtin_sanitizer(name: &str) -> Option<BuiltinSanitizer> {
    SANITIZERS.get(name.to_lowercase().as_str()).copied()
}

/// Names of all built-in validators, sorted
pub fn validator_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = VALIDATORS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Names of all built-in sanitizers, sorted
pub fn sanitizer_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = SANITIZERS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Composition directives understood by the binder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    ListOfObjects,
}

impl Composition {
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case(LIST_OF_OBJECTS) {
            Some(Composition::ListOfObjects)
        } else {
            None
        }
    }
}

/// Custom directives owned by one schema
#[derive(Clone, Default)]
pub struct CustomDirectives {
    validators: HashMap<String, CustomValidator>,
    sanitizers: HashMap<String, CustomSanitizer>,
}

impl CustomDirectives {
    pub fn register_validator(&mut self, name: &str, validator: CustomValidator) {
        self.validators.insert(name.to_lowercase(), validator);
    }

    pub fn register_sanitizer(&mut self, name: &str, sanitizer: CustomSanitizer) {
        self.sanitizers.insert(name.to_lowercase(), sanitizer);
    }

    pub fn validator(&self, name: &str) -> Option<CustomValidator> {
        self.validators.get(&name.to_lowercase()).copied()
    }

    pub fn sanitizer(&self, name: &str) -> Option<CustomSanitizer> {
        self.sanitizers.get(&name.to_lowercase()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty() && self.sanitizers.is_empty()
    }
}

impl fmt::Debug for CustomDirectives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut validators: Vec<&String> = self.validators.keys().collect();
        let mut sanitizers: Vec<&String> = self.sanitizers.keys().collect();
        validators.sort();
        sanitizers.sort();

        f.debug_struct("CustomDirectives")
            .field("validators", &validators)
            .field("sanitizers", &sanitizers)
            .finish()
    }
}
