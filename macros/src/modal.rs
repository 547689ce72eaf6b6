use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Expr, Ident, Result, Token,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

pub fn define_modal(input: TokenStream) -> TokenStream {
    let modal_def = parse_macro_input!(input as ModalDefinition);

    match generate_modal_code(modal_def) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

// AST structs for input parsing
struct ModalDefinition {
    name: Ident,
    custom_id: Expr,
    title: Expr,
    inputs: Vec<InputField>,
}

struct InputField {
    field_name: Ident,
    style: Expr, // InputTextStyle expression
    label: Expr,
    min_length: Option<Expr>,
    max_length: Option<Expr>,
    required: Option<Expr>,
    placeholder: Option<Expr>,
}

impl Parse for ModalDefinition {
    fn parse(input: ParseStream) -> Result<Self> {
        let name: Ident = input.parse()?;

        let content;
        syn::braced!(content in input);

        let mut custom_id = None;
        let mut title = None;
        let mut inputs = None;

        while !content.is_empty() {
            let field_ident: Ident = content.parse()?;
            content.parse::<Token![:]>()?;

            let slot_taken = match field_ident.to_string().as_str() {
                "custom_id" => custom_id.replace(content.parse::<Expr>()?).is_some(),
                "title" => title.replace(content.parse::<Expr>()?).is_some(),
                "inputs" => {
                    let inputs_content;
                    syn::bracketed!(inputs_content in content);

                    let mut input_list = Vec::new();
                    while !inputs_content.is_empty() {
                        input_list.push(inputs_content.parse::<InputField>()?);

                        if inputs_content.peek(Token![,]) {
                            inputs_content.parse::<Token![,]>()?;
                        }
                    }
                    inputs.replace(input_list).is_some()
                }
                _ => {
                    return Err(syn::Error::new(
                        field_ident.span(),
                        "Unknown field. Expected 'custom_id', 'title', or 'inputs'",
                    ));
                }
            };

            if slot_taken {
                return Err(syn::Error::new(
                    field_ident.span(),
                    format!("Duplicate '{field_ident}' field"),
                ));
            }

            // handle trailing comma
            if content.peek(Token![,]) {
                content.parse::<Token![,]>()?;
            }
        }

        let custom_id = custom_id
            .ok_or_else(|| syn::Error::new(input.span(), "Missing required field 'custom_id'"))?;
        let title =
            title.ok_or_else(|| syn::Error::new(input.span(), "Missing required field 'title'"))?;
        let inputs =
            inputs.ok_or_else(|| syn::Error::new(input.span(), "Missing required field 'inputs'"))?;

        // discord caps modals at five action rows
        if inputs.len() > 5 {
            return Err(syn::Error::new(
                name.span(),
                "A modal can hold at most 5 inputs",
            ));
        }

        Ok(ModalDefinition {
            name,
            custom_id,
            title,
            inputs,
        })
    }
}

impl Parse for InputField {
    fn parse(input: ParseStream) -> Result<Self> {
        let field_name: Ident = input.parse()?;

        let content;
        syn::braced!(content in input);

        let mut style = None;
        let mut label = None;
        let mut min_length = None;
        let mut max_length = None;
        let mut required = None;
        let mut placeholder = None;

        while !content.is_empty() {
            let field: Ident = content.parse()?;
            content.parse::<Token![:]>()?;

            let value = content.parse::<Expr>()?;
            match field.to_string().as_str() {
                "style" => style = Some(value),
                "label" => label = Some(value),
                "min_length" => min_length = Some(value),
                "max_length" => max_length = Some(value),
                "required" => required = Some(value),
                "placeholder" => placeholder = Some(value),
                _ => return Err(syn::Error::new(field.span(), "Unknown input property")),
            }

            if content.peek(Token![,]) {
                content.parse::<Token![,]>()?;
            }
        }

        Ok(InputField {
            style: style.ok_or_else(|| syn::Error::new(field_name.span(), "Missing style"))?,
            label: label.ok_or_else(|| syn::Error::new(field_name.span(), "Missing label"))?,
            field_name,
            min_length,
            max_length,
            required,
            placeholder,
        })
    }
}

fn generate_modal_code(modal_def: ModalDefinition) -> Result<TokenStream2> {
    let modal_name = &modal_def.name;
    let modal_custom_id = &modal_def.custom_id;
    let modal_title = &modal_def.title;

    let validated_name = Ident::new(&format!("{}Validated", modal_name), modal_name.span());

    let field_names: Vec<&Ident> = modal_def.inputs.iter().map(|i| &i.field_name).collect();
    let create_rows = generate_action_rows(&modal_def.inputs, false);
    let create_rows_prefill = generate_action_rows(&modal_def.inputs, true);
    let value_extractions = generate_value_extractions(&modal_def.inputs);

    Ok(quote! {
        pub struct #modal_name;

        #[derive(Clone, Debug)]
        pub struct #validated_name {
            #(pub #field_names: ::std::string::String,)*
        }

        #[allow(dead_code)]
        impl #modal_name {
            pub fn custom_id(prefix: &str) -> ::std::string::String {
                format!("{}:{}", prefix, #modal_custom_id)
            }

            pub fn create(prefix: &str) -> ::poise::serenity_prelude::CreateModal {
                ::poise::serenity_prelude::CreateModal::new(Self::custom_id(prefix), #modal_title)
                    .components(vec![#(#create_rows,)*])
            }

            pub fn create_prefilled(
                prefix: &str,
                #(#field_names: impl ::std::convert::Into<::std::string::String>,)*
            ) -> ::poise::serenity_prelude::CreateModal {
                ::poise::serenity_prelude::CreateModal::new(Self::custom_id(prefix), #modal_title)
                    .components(vec![#(#create_rows_prefill,)*])
            }

            pub fn validate(
                rows: &[::poise::serenity_prelude::ActionRow],
            ) -> ::anyhow::Result<#validated_name> {
                #(#value_extractions)*

                Ok(#validated_name {
                    #(#field_names,)*
                })
            }
        }
    })
}

fn generate_action_rows(inputs: &[InputField], prefill: bool) -> Vec<TokenStream2> {
    inputs
        .iter()
        .map(|input| {
            let field_name = &input.field_name;
            let field_name_str = field_name.to_string();
            let label = &input.label;
            let style = &input.style;

            let mut builder = quote! {
                ::poise::serenity_prelude::CreateInputText::new(#style, #label, #field_name_str)
            };

            if prefill {
                builder = quote! { #builder.value(#field_name) };
            }
            if let Some(min_length) = &input.min_length {
                builder = quote! { #builder.min_length(#min_length) };
            }
            if let Some(max_length) = &input.max_length {
                builder = quote! { #builder.max_length(#max_length) };
            }
            if let Some(required) = &input.required {
                builder = quote! { #builder.required(#required) };
            }
            if let Some(placeholder) = &input.placeholder {
                builder = quote! { #builder.placeholder(#placeholder) };
            }

            quote! { ::poise::serenity_prelude::CreateActionRow::InputText(#builder) }
        })
        .collect()
}

fn generate_value_extractions(inputs: &[InputField]) -> Vec<TokenStream2> {
    inputs
        .iter()
        .map(|input| {
            let field_name = &input.field_name;
            let field_name_str = field_name.to_string();

            quote! {
                let #field_name = rows
                    .iter()
                    .flat_map(|row| row.components.iter())
                    .find_map(|component| match component {
                        ::poise::serenity_prelude::ActionRowComponent::InputText(input)
                            if input.custom_id == #field_name_str =>
                        {
                            Some(input.value.clone().unwrap_or_default())
                        }
                        _ => None,
                    })
                    .ok_or_else(|| {
                        ::anyhow::anyhow!("Invalid modal data: Missing input field: {}", #field_name_str)
                    })?;
            }
        })
        .collect()
}
