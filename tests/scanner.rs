#[cfg(test)]
mod scanner_tests {
    use rox as lox;

    use lox::error::{Location, LoxError, Result};
    use lox::scanner::*;
    use lox::token::*;

    use assert_matches::assert_matches;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(result: &Result<Token>, expected_type: TokenType, expected_lexeme: &str) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.token_type, expected_type,
                    "Expected token type {:?}, got {:?}",
                    expected_type, token.token_type
                );
                assert_eq!(
                    token.lexeme, expected_lexeme,
                    "Expected lexeme '{}', got '{}'",
                    expected_lexeme, token.lexeme
                );
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_brackets_and_percent() {
        assert_token_sequence(
            "a[1] % 2",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::NUMBER(0.0), "1"),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::PERCENT, "%"),
                (TokenType::NUMBER(0.0), "2"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >=",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_keywords() {
        assert_token_sequence(
            "class operator break breaker",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::OPERATOR, "operator"),
                (TokenType::BREAK, "break"),
                (TokenType::IDENTIFIER, "breaker"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        let results: Vec<_> = scanner.collect();

        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[Line 1] Error at '$': Unexpected character.",
                "[Line 1] Error at '#': Unexpected character.",
            ]
        );
    }

    #[test]
    fn test_multibyte_unexpected_character() {
        let (tokens, errors) = scan("é;");

        assert_eq!(tokens.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_matches!(
            &errors[0],
            LoxError::Syntax { location: Location::At(c), .. } if c == "é"
        );
    }

    #[test]
    fn test_number_and_string_literals() {
        let (tokens, errors) = scan("12 3.5 \"hi\"");

        assert!(errors.is_empty());
        assert_eq!(tokens[0].to_string(), "NUMBER 12 12.0");
        assert_eq!(tokens[1].to_string(), "NUMBER 3.5 3.5");
        assert_eq!(tokens[2].to_string(), "STRING \"hi\" hi");
        assert_eq!(tokens[3].to_string(), "EOF  null");
    }

    #[test]
    fn test_trailing_dot_is_not_fraction() {
        assert_token_sequence(
            "1.",
            &[
                (TokenType::NUMBER(0.0), "1"),
                (TokenType::DOT, "."),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_multiline_string_counts_lines() {
        let (tokens, errors) = scan("\"a\nb\"\nx");

        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::STRING(String::new()));
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let (_, errors) = scan("\"abc");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[Line 1] Error at end: Unterminated string.");
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "a // line comment\n/* block\n * comment */ b";
        let (tokens, errors) = scan(source);

        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].lexeme, "b");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_block_comment_needs_adjacent_star_slash() {
        // A lone '*' or '/' inside the comment must not end it.
        let (tokens, errors) = scan("/* a * b / c */ d");

        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "d");
    }

    #[test]
    fn test_block_comments_do_not_nest() {
        let (tokens, _) = scan("/* outer /* inner */ x */");
        let lexemes: Vec<&str> = tokens.iter().map(|t| t.lexeme.as_str()).collect();

        assert_eq!(lexemes, vec!["x", "*", "/", ""]);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (tokens, errors) = scan("a /* never closed\n");

        assert_eq!(tokens.len(), 2);
        assert_eq!(
            errors[0].to_string(),
            "[Line 2] Error at end: Unterminated block comment."
        );
    }

    #[test]
    fn test_eof_is_emitted_once() {
        let mut scanner = Scanner::new("");

        assert_matches!(scanner.next(), Some(Ok(Token { token_type: TokenType::EOF, .. })));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
