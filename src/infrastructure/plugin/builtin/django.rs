//! Django Plugin
//!
//! Built-in template provider for Django apps.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::plugin::{
    Capability, Plugin, PluginContext, PluginDescriptor, PluginError, PluginMetadata,
    PluginSource, TemplateProvider,
};

pub const MODULE: &str = "django";
pub const ENTRY: &str = "DjangoTemplates";

const MODEL_TEMPLATE: &str = r#"from django.db import models


class {{ model_name }}(models.Model):
{% for field_name, field_type in fields.items() %}
    {{ field_name }} = models.{{ field_type }}
{% endfor %}

    class Meta:
{% for key, value in meta_options.items() %}
        {{ key }} = {{ value }}
{% endfor %}

    def __str__(self):
        return f"{{ model_name }}({self.pk})"
"#;

const VIEW_TEMPLATE: &str = r#"from django.views.generic import {{ view_type }}

from .models import {{ model_name }}


class {{ view_name }}({{ view_type }}):
    model = {{ model_name }}
    template_name = "{{ template_name }}"
"#;

const URL_TEMPLATE: &str = r#"from django.urls import path

from . import views

app_name = "{{ namespace }}"

urlpatterns = [
{% for view in views %}
    path("{{ view.path }}", views.{{ view.name }}.as_view(), name="{{ view.url_name }}"),
{% endfor %}
]
"#;

const FORM_TEMPLATE: &str = r#"from django import forms

from .models import {{ model_name }}


class {{ model_name }}Form(forms.ModelForm):
    class Meta:
        model = {{ model_name }}
        fields = {{ fields }}
"#;

const ADMIN_TEMPLATE: &str = r#"from django.contrib import admin

from .models import {{ model_name }}


@admin.register({{ model_name }})
class {{ model_name }}Admin(admin.ModelAdmin):
    list_display = {{ list_display }}
    search_fields = {{ search_fields }}
"#;

/// Django template plugin
#[derive(Debug)]
pub struct DjangoPlugin {
    metadata: PluginMetadata,
}

impl DjangoPlugin {
    pub fn new() -> Self {
        Self {
            metadata: metadata(),
        }
    }
}

impl Default for DjangoPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn metadata() -> PluginMetadata {
    PluginMetadata::new("Django", "1.0.0")
        .with_description("Django model, view, URL, form and admin templates")
        .with_author("PMP Codegen")
        .with_dependency("templates")
}

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(
        format!("{}.{}", MODULE, ENTRY),
        metadata(),
        vec![Capability::TemplateProvider],
        PluginSource::Builtin,
        || Ok(Arc::new(DjangoPlugin::new()) as Arc<dyn Plugin>),
    )
}

#[async_trait]
impl Plugin for DjangoPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::TemplateProvider]
    }

    async fn initialize(&self, _context: PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn as_template_provider(&self) -> Option<&dyn TemplateProvider> {
        Some(self)
    }
}

#[async_trait]
impl TemplateProvider for DjangoPlugin {
    async fn templates(&self) -> Result<HashMap<String, String>, PluginError> {
        Ok(HashMap::from([
            ("django_model".to_string(), MODEL_TEMPLATE.to_string()),
            ("django_view".to_string(), VIEW_TEMPLATE.to_string()),
            ("django_url".to_string(), URL_TEMPLATE.to_string()),
            ("django_form".to_string(), FORM_TEMPLATE.to_string()),
            ("django_admin".to_string(), ADMIN_TEMPLATE.to_string()),
        ]))
    }
}
