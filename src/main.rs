fn main() {
    soundpad_lib::run()
}
