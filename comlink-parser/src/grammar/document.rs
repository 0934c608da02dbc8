use crate::grammar::LineMap;
use crate::model::{
    CallSite, DocumentName, MapBody, MapDefinition, MapDocument, MapHeader, NamedFieldDefinition,
    NamedModelDefinition, ProfileDefinition, ProfileDocument, ProfileHeader, ProfileId,
    UseCaseDefinition, UseCaseSafety, Version,
};

/// First line of a documentation string, used as the definition title.
fn title_of(doc: &str) -> Option<String> {
    doc.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
}

peg::parser! {
    pub(crate) grammar document_parser(lines: &LineMap, source: &str) for str {

        pub(crate) rule profile() -> ProfileDocument
            = _ start:position!() header:profile_header() _
              definitions:(d:profile_definition() _ { d })* end:position!() ![_] {
                ProfileDocument {
                    header,
                    definitions,
                    location: lines.location(start, end, source),
                }
            }

        pub(crate) rule map() -> MapDocument
            = _ start:position!() header:map_header() _
              definitions:(d:map_definition() _ { d })* end:position!() ![_] {
                MapDocument {
                    header,
                    definitions,
                    location: lines.location(start, end, source),
                }
            }

        rule profile_header() -> ProfileHeader
            = start:position!() "name" _ "=" _ name:document_name() _
              "version" _ "=" _ version:version() end:position!() {
                ProfileHeader {
                    scope: name.scope,
                    name: name.name,
                    version,
                    location: lines.location(start, end, source),
                }
            }

        rule map_header() -> MapHeader
            = start:position!() "profile" _ "=" _ profile:profile_id() _
              "provider" _ "=" _ provider:string_literal()
              variant:(_ "variant" _ "=" _ v:string_literal() { v })? end:position!() {
                MapHeader {
                    profile,
                    provider,
                    variant,
                    location: lines.location(start, end, source),
                }
            }

        rule document_name() -> DocumentName
            = s:string_literal() {?
                DocumentName::parse(&s).ok_or("document name \"[scope/]name\"")
            }

        rule version() -> Version
            = s:string_literal() {?
                Version::parse(&s).ok_or("version \"<major>.<minor>[.<patch>]\"")
            }

        rule profile_id() -> ProfileId
            = s:string_literal() {?
                ProfileId::parse(&s).ok_or("profile id \"[scope/]name@<major>.<minor>\"")
            }

        rule profile_definition() -> ProfileDefinition
            = start:position!() title:(d:doc_string() _ { title_of(&d) })?
              definition:(
                  usecase(start, title.clone().flatten())
                / model(start, title.clone().flatten())
                / field(start, title.clone().flatten())
              ) { definition }

        rule usecase(start: usize, title: Option<String>) -> ProfileDefinition
            = "usecase" !ident_char() _ name:ident() _ safety:(s:safety() _ { s })?
              block() end:position!() {
                ProfileDefinition::UseCase(UseCaseDefinition {
                    name,
                    safety,
                    title: title.clone(),
                    location: lines.location(start, end, source),
                })
            }

        rule safety() -> UseCaseSafety
            = "safe" !ident_char() { UseCaseSafety::Safe }
            / "unsafe" !ident_char() { UseCaseSafety::Unsafe }
            / "idempotent" !ident_char() { UseCaseSafety::Idempotent }

        rule model(start: usize, title: Option<String>) -> ProfileDefinition
            = "model" !ident_char() _ name:ident() (_ block())? end:position!() {
                ProfileDefinition::Model(NamedModelDefinition {
                    name,
                    title: title.clone(),
                    location: lines.location(start, end, source),
                })
            }

        rule field(start: usize, title: Option<String>) -> ProfileDefinition
            = "field" !ident_char() _ name:ident() type_name:(_ t:field_type() { t })?
              end:position!() {
                ProfileDefinition::Field(NamedFieldDefinition {
                    name,
                    type_name,
                    title: title.clone(),
                    location: lines.location(start, end, source),
                })
            }

        rule field_type() -> String
            = !reserved() t:ident() { t }
            / block() { "{...}".to_string() }

        rule map_definition() -> MapDefinition
            = start:position!() (doc_string() _)? "map" !ident_char() _ name:ident() _
              calls:block() end:position!() {
                MapDefinition::Map(MapBody {
                    name,
                    calls,
                    location: lines.location(start, end, source),
                })
            }
            / start:position!() (doc_string() _)? "operation" !ident_char() _ name:ident() _
              calls:block() end:position!() {
                MapDefinition::Operation(MapBody {
                    name,
                    calls,
                    location: lines.location(start, end, source),
                })
            }

        // Bodies are kept opaque apart from their `call` statements.
        rule block() -> Vec<CallSite>
            = "{" items:block_item()* "}" { items.into_iter().flatten().collect() }

        rule block_item() -> Vec<CallSite>
            = c:call_site() { vec![c] }
            / b:block() { b }
            / doc_string() { Vec::new() }
            / comment() { Vec::new() }
            / ident() { Vec::new() }
            / !['{' | '}'] [_] { Vec::new() }

        rule call_site() -> CallSite
            = start:position!() "call" !ident_char() _ operation:ident() end:position!() {
                CallSite {
                    operation,
                    location: lines.location(start, end, source),
                }
            }

        rule reserved()
            = ("usecase" / "model" / "field" / "map" / "operation") !ident_char()

        rule ident() -> String
            = quiet!{ s:$(['a'..='z' | 'A'..='Z' | '_'] ident_char()*) { s.to_string() } }
            / expected!("identifier")

        rule ident_char()
            = ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']

        rule doc_string() -> String
            = "\"\"\"" s:$((!"\"\"\"" [_])*) "\"\"\"" { s.to_string() }
            / string_literal()

        rule string_literal() -> String
            = quiet!{ "\"" s:$((!['"' | '\\' | '\n'] [_] / "\\" [_])*) "\"" { s.to_string() } }
            / expected!("string")

        rule comment()
            = "//" (!['\n'] [_])*

        rule _()
            = quiet!{ ([' ' | '\t' | '\r' | '\n'] / comment())* }
    }
}
