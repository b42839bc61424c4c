//! Parser for the plotting script the model answers with in chart mode.
//!
//! The grammar is deliberately closed: one figure assignment and one render
//! call. Model output is text, never executed as code; the executor rewrites
//! the display call and interprets the script.
//!
//! ```text
//! fig = bar(x=country, y=total_sales, agg=sum, title="Sales by country")
//! fig.show()
//! ```

/// Display call the model is told to emit.
pub const DISPLAY_CALL: &str = "fig.show()";
/// Render call the executor understands. The display call is rewritten to
/// this before parsing.
pub const RENDER_CALL: &str = "fig.render()";

/// Fixed substitution rewriting the script's display call into the host's
/// render call.
pub fn rewrite_display_call(script: &str) -> String {
    script.replace(DISPLAY_CALL, RENDER_CALL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    Bar,
    Line,
    Scatter,
}

impl ChartType {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "bar" => Some(Self::Bar),
            "line" => Some(Self::Line),
            "scatter" => Some(Self::Scatter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

impl Aggregation {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sum" => Some(Self::Sum),
            "avg" | "mean" => Some(Self::Mean),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "count" => Some(Self::Count),
            _ => None,
        }
    }
}

/// Parsed figure: what to draw and from which columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub chart_type: ChartType,
    pub x: String,
    pub y: String,
    pub agg: Option<Aggregation>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    String(String),
    Eq,
    LParen,
    RParen,
    Comma,
    Dot,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '=' => {
                tokens.push(Token::Eq);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            '.' => {
                tokens.push(Token::Dot);
                chars.next();
            }
            '"' => {
                chars.next(); // consume opening quote
                let mut string_val = String::new();
                let mut found_closing_quote = false;
                while let Some(&c) = chars.peek() {
                    if c == '\\' {
                        chars.next();
                        match chars.peek() {
                            Some(&'n') => {
                                string_val.push('\n');
                                chars.next();
                            }
                            Some(&'t') => {
                                string_val.push('\t');
                                chars.next();
                            }
                            Some(&'\\') => {
                                string_val.push('\\');
                                chars.next();
                            }
                            Some(&'"') => {
                                string_val.push('"');
                                chars.next();
                            }
                            Some(&other) => {
                                string_val.push('\\');
                                string_val.push(other);
                                chars.next();
                            }
                            None => {
                                return Err("Unterminated escape sequence in string".to_string())
                            }
                        }
                    } else if c == '"' {
                        chars.next();
                        found_closing_quote = true;
                        break;
                    } else {
                        string_val.push(c);
                        chars.next();
                    }
                }
                if !found_closing_quote {
                    return Err("Unterminated string literal".to_string());
                }
                tokens.push(Token::String(string_val));
            }
            _ if c.is_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&nc) = chars.peek() {
                    if nc.is_alphanumeric() || nc == '_' {
                        ident.push(nc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Identifier(ident));
            }
            _ => return Err(format!("Unexpected character: {}", c)),
        }
    }
    Ok(tokens)
}

/// One key=value argument inside the figure call.
fn parse_argument(tokens: &[Token]) -> Result<(String, String), String> {
    match tokens {
        [Token::Identifier(key), Token::Eq, Token::Identifier(value)] => {
            Ok((key.to_lowercase(), value.clone()))
        }
        [Token::Identifier(key), Token::Eq, Token::String(value)] => {
            Ok((key.to_lowercase(), value.clone()))
        }
        _ => Err("Arguments must be key=value pairs, e.g. x=country".to_string()),
    }
}

fn split_arguments(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut result = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if *token == Token::Comma {
            result.push(current);
            current = Vec::new();
        } else {
            current.push(token.clone());
        }
    }
    result.push(current);
    result
}

/// Parse the figure assignment line: `fig = FUNC(key=value, ...)`.
fn parse_figure_line(line: &str) -> Result<ChartSpec, String> {
    let tokens = tokenize(line)?;
    let (func, args) = match tokens.as_slice() {
        [Token::Identifier(fig), Token::Eq, Token::Identifier(func), Token::LParen, rest @ .., Token::RParen]
            if fig == "fig" =>
        {
            (func.clone(), rest)
        }
        _ => {
            return Err("Expected an assignment like fig = bar(x=..., y=...)".to_string());
        }
    };

    let chart_type = ChartType::from_name(&func)
        .ok_or_else(|| format!("Unknown chart function: {}. Valid: bar, line, scatter", func))?;

    let mut x = None;
    let mut y = None;
    let mut agg = None;
    let mut title = None;
    for chunk in split_arguments(args) {
        if chunk.is_empty() {
            continue;
        }
        let (key, value) = parse_argument(&chunk)?;
        match key.as_str() {
            "x" => x = Some(value),
            "y" => y = Some(value),
            "agg" => {
                agg = Some(Aggregation::from_name(&value).ok_or_else(|| {
                    format!(
                        "Unknown aggregation: {}. Valid: sum, mean, min, max, count",
                        value
                    )
                })?)
            }
            "title" => title = Some(value),
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(ChartSpec {
        chart_type,
        x: x.ok_or("Figure requires an x argument")?,
        y: y.ok_or("Figure requires a y argument")?,
        agg,
        title,
    })
}

fn is_render_line(line: &str) -> bool {
    let tokens = match tokenize(line) {
        Ok(t) => t,
        Err(_) => return false,
    };
    matches!(
        tokens.as_slice(),
        [Token::Identifier(fig), Token::Dot, Token::Identifier(call), Token::LParen, Token::RParen]
            if fig == "fig" && call == "render"
    )
}

/// Parse a full script (after `rewrite_display_call`): one figure assignment
/// followed by `fig.render()`. Blank lines and `#` comments are ignored.
/// A script that never calls render is an error; rendering is what produces
/// output.
pub fn parse_script(script: &str) -> Result<ChartSpec, String> {
    let mut spec = None;
    let mut rendered = false;

    for line in script.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if is_render_line(line) {
            if spec.is_none() {
                return Err("fig.render() before the figure was defined".to_string());
            }
            rendered = true;
        } else if line.starts_with("fig") && spec.is_none() {
            spec = Some(parse_figure_line(line)?);
        } else {
            return Err(format!("Unexpected line in plotting script: {}", line));
        }
    }

    let spec = spec.ok_or("Script does not define a figure")?;
    if !rendered {
        return Err("Script never renders the figure".to_string());
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_bar_script() {
        let script = "fig = bar(x=country, y=total_sales)\nfig.render()";
        let spec = parse_script(script).unwrap();
        assert_eq!(
            spec,
            ChartSpec {
                chart_type: ChartType::Bar,
                x: "country".to_string(),
                y: "total_sales".to_string(),
                agg: None,
                title: None,
            }
        );
    }

    #[test]
    fn test_parse_full_argument_set() {
        let script =
            "fig = line(x=OrderDate, y=Total_Sales, agg=sum, title=\"Sales over time\")\nfig.render()";
        let spec = parse_script(script).unwrap();
        assert_eq!(spec.chart_type, ChartType::Line);
        assert_eq!(spec.agg, Some(Aggregation::Sum));
        assert_eq!(spec.title.as_deref(), Some("Sales over time"));
    }

    #[test]
    fn test_quoted_column_names() {
        let script = "fig = scatter(x=\"unit price\", y=\"qty\")\nfig.render()";
        let spec = parse_script(script).unwrap();
        assert_eq!(spec.x, "unit price");
        assert_eq!(spec.y, "qty");
    }

    #[test]
    fn test_display_call_rewritten() {
        let script = "fig = bar(x=a, y=b)\nfig.show()";
        let rewritten = rewrite_display_call(script);
        assert!(rewritten.contains(RENDER_CALL));
        assert!(!rewritten.contains(DISPLAY_CALL));
        assert!(parse_script(&rewritten).is_ok());
    }

    #[test]
    fn test_script_without_render_is_error() {
        let script = "fig = bar(x=a, y=b)";
        let err = parse_script(script).unwrap_err();
        assert!(err.contains("never renders"));
    }

    #[test]
    fn test_render_before_figure_is_error() {
        let script = "fig.render()\nfig = bar(x=a, y=b)";
        assert!(parse_script(script).is_err());
    }

    #[test]
    fn test_unknown_chart_function() {
        let script = "fig = pie(x=a, y=b)\nfig.render()";
        let err = parse_script(script).unwrap_err();
        assert!(err.contains("Unknown chart function"));
    }

    #[test]
    fn test_unknown_aggregation() {
        let script = "fig = bar(x=a, y=b, agg=median)\nfig.render()";
        assert!(parse_script(script).is_err());
    }

    #[test]
    fn test_missing_axis_argument() {
        let script = "fig = bar(x=a)\nfig.render()";
        let err = parse_script(script).unwrap_err();
        assert!(err.contains("y argument"));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let script = "# chart\n\nfig = bar(x=a, y=b)\n\nfig.render()\n";
        assert!(parse_script(script).is_ok());
    }

    #[test]
    fn test_unexpected_line_is_error() {
        let script = "import plotly\nfig = bar(x=a, y=b)\nfig.render()";
        assert!(parse_script(script).is_err());
    }

    #[test]
    fn test_mean_alias() {
        let script = "fig = bar(x=a, y=b, agg=avg)\nfig.render()";
        let spec = parse_script(script).unwrap();
        assert_eq!(spec.agg, Some(Aggregation::Mean));
    }
}
